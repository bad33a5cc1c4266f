use std::cell::RefCell;
use std::collections::VecDeque;

use catalog::{LocationError, LocationStore, LoadOutcome};
use console_error_panic_hook::set_once;
use explorer::{Explorer, ExplorerConfig, Key, KeyOutcome};
use foundation::time::Millis;
use gloo_net::http::Request;
use gloo_timers::callback::Timeout;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};

mod log;
mod map;
mod page;
mod worker;

pub use worker::OfflineWorker;

use map::LeafletMap;
use page::DomPage;

type App = Explorer<LeafletMap, DomPage>;

/// Input from the page, queued so collaborators can report events while the
/// explorer is busy (Leaflet fires `movestart` from inside `flyTo`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum UiEvent {
    BeginJourney,
    MarkerActivated(usize),
    CloseRequested,
    TourStart,
    TourNext,
    TourPrev,
    TourToggle,
    TourEnd,
    ZoomIn,
    ZoomOut,
    MotionStart,
    MotionEnd,
    ImageLoaded(u64),
    ImageFailed(u64),
    Tick,
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
    static PENDING: RefCell<VecDeque<UiEvent>> = const { RefCell::new(VecDeque::new()) };
    /// The pending host timer and the deadline it was set for.
    static TICK: RefCell<Option<(Millis, Timeout)>> = const { RefCell::new(None) };
}

fn now() -> Millis {
    Millis(js_sys::Date::now().max(0.0) as u64)
}

pub(crate) fn dispatch(event: UiEvent) {
    PENDING.with(|q| q.borrow_mut().push_back(event));
    pump();
}

/// Drains queued events into the explorer. A re-entrant call returns at once;
/// the outer call picks up whatever was queued meanwhile.
fn pump() {
    APP.with(|app| {
        let Ok(mut slot) = app.try_borrow_mut() else {
            return;
        };
        let Some(explorer) = slot.as_mut() else {
            return;
        };
        while let Some(event) = PENDING.with(|q| q.borrow_mut().pop_front()) {
            apply(explorer, event);
        }
        explorer.advance(now());
        schedule_tick(explorer.next_due());
    });
}

fn apply(explorer: &mut App, event: UiEvent) {
    let at = now();
    match event {
        UiEvent::BeginJourney => explorer.begin_journey(at),
        UiEvent::MarkerActivated(index) => {
            explorer.handle_marker_activated(scene::MarkerId::from_index(index), at)
        }
        UiEvent::CloseRequested => explorer.handle_close_requested(),
        UiEvent::TourStart => explorer.start_tour(),
        UiEvent::TourNext => explorer.tour_next(),
        UiEvent::TourPrev => explorer.tour_prev(),
        UiEvent::TourToggle => explorer.tour_toggle_expand(),
        UiEvent::TourEnd => explorer.end_tour(),
        UiEvent::ZoomIn => explorer.zoom_in(),
        UiEvent::ZoomOut => explorer.zoom_out(),
        UiEvent::MotionStart => explorer.on_motion_start(),
        UiEvent::MotionEnd => explorer.on_motion_end(),
        UiEvent::ImageLoaded(revision) => explorer.on_panel_image_loaded(revision),
        UiEvent::ImageFailed(revision) => explorer.on_panel_image_error(revision),
        UiEvent::Tick => {}
    }
}

/// Keeps one host timer armed for the earliest deadline. A later timer is
/// replaced (and cancelled on drop) when an earlier deadline shows up.
fn schedule_tick(due: Option<Millis>) {
    let Some(due) = due else {
        return;
    };
    TICK.with(|slot| {
        let mut slot = slot.borrow_mut();
        if slot.as_ref().is_some_and(|(at, _)| *at <= due) {
            return;
        }
        let delay = due.since(now()).min(u64::from(u32::MAX)) as u32;
        let timeout = Timeout::new(delay, || {
            let _ = TICK.with(|slot| slot.borrow_mut().take());
            dispatch(UiEvent::Tick);
        });
        *slot = Some((due, timeout));
    });
}

pub(crate) fn handle_key(event: web_sys::KeyboardEvent) {
    let key = match event.key().as_str() {
        "Escape" => Key::Escape,
        "Tab" => Key::Tab {
            shift: event.shift_key(),
        },
        _ => Key::Other,
    };
    let outcome = APP.with(|app| {
        app.try_borrow_mut()
            .ok()
            .and_then(|mut slot| slot.as_mut().map(|explorer| explorer.on_key(key)))
    });
    if outcome == Some(KeyOutcome::Handled) {
        event.prevent_default();
    }
    pump();
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Builds the explorer once the location data has resolved.
///
/// `config_json` overrides [`ExplorerConfig`] defaults; `locations_url`
/// falls back to the bundled dataset when absent.
#[wasm_bindgen]
pub fn boot(config_json: Option<String>, locations_url: Option<String>) {
    let (mut config, config_error) = match config_json.as_deref() {
        Some(raw) => ExplorerConfig::from_json_or_default(raw),
        None => (ExplorerConfig::default(), None),
    };
    log::init(&config.log_level);
    if let Some(script) = config.service_worker_url.clone() {
        register_offline_worker(script);
    }

    spawn_local(async move {
        let outcome = match locations_url {
            Some(url) => catalog::resolve(fetch_locations(&url).await),
            None => catalog::resolve(LocationStore::bundled()),
        };

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            tracing::error!("no document; explorer not started");
            return;
        };
        if prefers_reduced_motion() {
            config.reduced_motion = true;
        }

        let (map, map_error) =
            match LeafletMap::new("map", config.overview, config.min_zoom, config.max_zoom) {
                Ok(map) => (map, None),
                Err(err) => (LeafletMap::unavailable(), Some(err)),
            };
        let page = DomPage::new(document);
        page.wire_controls();

        let at = now();
        let mut explorer = start_explorer(config, outcome, map, page, at);
        if let Some(err) = map_error {
            tracing::error!(?err, "map initialization failed");
            explorer.report_map_unavailable(at);
        }
        if let Some(err) = config_error {
            explorer.report(at, format!("Using default settings: {err}"));
        }
        APP.with(|app| *app.borrow_mut() = Some(explorer));
        pump();
    });
}

fn start_explorer(
    config: ExplorerConfig,
    outcome: LoadOutcome,
    map: LeafletMap,
    page: DomPage,
    at: Millis,
) -> App {
    tracing::info!(locations = outcome.store.len(), "explorer starting");
    Explorer::from_load(config, outcome, map, page, at)
}

/// Registers the offline worker as a module script. Failure only costs
/// offline support.
fn register_offline_worker(script: String) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let navigator = window.navigator();
    if !js_sys::Reflect::has(&navigator, &JsValue::from_str("serviceWorker")).unwrap_or(false) {
        tracing::info!("service workers unsupported; running online only");
        return;
    }
    let options = web_sys::RegistrationOptions::new();
    options.set_type("module");
    let pending = navigator.service_worker().register_with_options(&script, &options);
    spawn_local(async move {
        match JsFuture::from(pending).await {
            Ok(_) => tracing::info!(%script, "offline worker registered"),
            Err(err) => tracing::warn!(%script, ?err, "offline worker registration failed"),
        }
    });
}

fn prefers_reduced_motion() -> bool {
    web_sys::window()
        .and_then(|w| w.match_media("(prefers-reduced-motion: reduce)").ok().flatten())
        .is_some_and(|mql| mql.matches())
}

async fn fetch_locations(url: &str) -> Result<catalog::LoadReport, LocationError> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| LocationError::Unavailable(e.to_string()))?;
    if !resp.ok() {
        return Err(LocationError::Unavailable(format!("HTTP {}", resp.status())));
    }
    let text = resp
        .text()
        .await
        .map_err(|e| LocationError::Unavailable(e.to_string()))?;
    LocationStore::from_json(&text)
}
