use catalog::{LoadOutcome, LocationStore};
use foundation::geo::Viewport;
use foundation::time::Millis;
use runtime::{Metrics, NoticeBus, TimerId, TimerQueue};
use scene::{InteractionMode, MarkerChange, MarkerRegistry, MarkerStage};

use crate::config::ExplorerConfig;
use crate::focus::FocusTarget;
use crate::panel::{DetailPanel, ImageFailure};
use crate::surface::{MapSurface, MarkerSpec, Page};

pub const MAP_UNAVAILABLE: &str =
    "Map initialization experienced an issue. Some features may be limited.";

/// Keyboard input the explorer reacts to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    Tab { shift: bool },
    Other,
}

/// `Handled` tells the host to suppress the browser default.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    Ignored,
}

/// Continuations parked on the timer queue.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Deferred {
    ArmPanelFocus { session: u64 },
    RevealMarkers,
    FocusMapAfterWelcome,
    HideNotice { id: u64 },
}

/// One exploration session: owns the selection, tour, panel and timers.
///
/// Every entry point is infallible. Missing data or detached elements turn
/// the call into a logged no-op so nothing ever throws back into the host's
/// event dispatch.
pub struct Explorer<M, P> {
    pub(crate) config: ExplorerConfig,
    pub(crate) store: LocationStore,
    pub(crate) map: M,
    pub(crate) page: P,
    pub(crate) stage: MarkerStage,
    pub(crate) markers_ready: bool,
    /// Animation lock. Written only by `on_motion_start` / `on_motion_end`.
    pub(crate) animating: bool,
    pub(crate) panel: DetailPanel,
    pub(crate) timers: TimerQueue<Deferred>,
    pub(crate) metrics: Metrics,
    notices: NoticeBus,
    shown_notice: Option<(u64, TimerId)>,
    journey_started: bool,
}

impl<M: MapSurface, P: Page> Explorer<M, P> {
    pub fn new(config: ExplorerConfig, store: LocationStore, map: M, page: P) -> Self {
        Self {
            config,
            store,
            map,
            page,
            stage: MarkerStage::default(),
            markers_ready: false,
            animating: false,
            panel: DetailPanel::new(),
            timers: TimerQueue::new(),
            metrics: Metrics::new(),
            notices: NoticeBus::new(),
            shown_notice: None,
            journey_started: false,
        }
    }

    /// Builds a session from a location load, queueing a notice for every
    /// problem worth surfacing.
    pub fn from_load(
        config: ExplorerConfig,
        outcome: LoadOutcome,
        map: M,
        page: P,
        now: Millis,
    ) -> Self {
        let LoadOutcome { store, problems } = outcome;
        let mut explorer = Self::new(config, store, map, page);
        if !problems.is_empty() {
            let message = if explorer.store.is_empty() {
                "Failed to load map data.".to_string()
            } else {
                format!("{} location records could not be shown.", problems.len())
            };
            explorer.report(now, message);
        }
        explorer
    }

    /// The map surface failed to come up. Everything else stays usable.
    pub fn report_map_unavailable(&mut self, now: Millis) {
        self.metrics.inc("map_init_failures");
        self.report(now, MAP_UNAVAILABLE);
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn store(&self) -> &LocationStore {
        &self.store
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn mode(&self) -> InteractionMode {
        self.stage.mode()
    }

    pub fn markers(&self) -> &MarkerRegistry {
        self.stage.registry()
    }

    pub fn markers_ready(&self) -> bool {
        self.markers_ready
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn panel(&self) -> &DetailPanel {
        &self.panel
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// When the host should next call [`Explorer::advance`].
    pub fn next_due(&self) -> Option<Millis> {
        self.timers.next_due()
    }

    /// Creates one marker per location. Later calls do nothing.
    pub fn init_markers(&mut self) {
        if self.markers_ready {
            return;
        }
        let specs: Vec<MarkerSpec> = self
            .store
            .iter()
            .enumerate()
            .map(|(index, loc)| MarkerSpec {
                marker: scene::MarkerId::from_index(index),
                position: loc.position(),
                title: loc.name.clone(),
                label: format!("View details for {}", loc.name),
                reveal_delay_s: 0.2 + index as f64 * 0.1,
            })
            .collect();
        self.map.add_markers(&specs);
        self.stage = MarkerStage::new(MarkerRegistry::new(specs.len()));
        self.markers_ready = true;
        tracing::info!(count = specs.len(), "markers instantiated");
    }

    /// The user dismissed the welcome overlay.
    pub fn begin_journey(&mut self, now: Millis) {
        if self.journey_started {
            return;
        }
        self.journey_started = true;
        self.page.hide_welcome();
        self.timers.schedule(
            now.after(self.config.marker_reveal_delay_ms),
            Deferred::RevealMarkers,
        );
        self.timers.schedule(
            now.after(self.config.welcome_fade_ms),
            Deferred::FocusMapAfterWelcome,
        );
    }

    pub fn zoom_in(&mut self) {
        self.map.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.map.zoom_out();
    }

    pub fn on_key(&mut self, key: Key) -> KeyOutcome {
        match key {
            Key::Escape if self.panel.is_open() => {
                self.handle_close_requested();
                KeyOutcome::Handled
            }
            Key::Tab { shift } => {
                let target = self
                    .panel
                    .trap()
                    .and_then(|trap| trap.redirect(self.page.focused(), shift));
                match target {
                    Some(target) => {
                        self.page.focus(target);
                        KeyOutcome::Handled
                    }
                    None => KeyOutcome::Ignored,
                }
            }
            _ => KeyOutcome::Ignored,
        }
    }

    pub fn on_panel_image_loaded(&mut self, revision: u64) {
        if self.panel.on_image_loaded(revision) {
            self.page.set_panel_image_loading(false);
        }
    }

    pub fn on_panel_image_error(&mut self, revision: u64) {
        match self.panel.on_image_error(revision) {
            ImageFailure::Stale => {}
            ImageFailure::Substitute(placeholder) => {
                tracing::warn!(revision, "panel image failed; using placeholder");
                self.page.set_panel_image_loading(false);
                self.page.set_panel_image(placeholder);
            }
            ImageFailure::Exhausted => self.page.set_panel_image_loading(false),
        }
    }

    /// Queues a user-visible error notice.
    pub fn report(&mut self, now: Millis, message: impl Into<String>) {
        self.notices.error(now, message);
    }

    /// Shows queued notices. Each replaces the one still on screen.
    pub fn flush_notices(&mut self, now: Millis) {
        for notice in self.notices.drain() {
            if let Some((old, timer)) = self.shown_notice.take() {
                self.timers.cancel(timer);
                self.page.hide_notice(old);
            }
            self.page.show_notice(&notice);
            let timer = self.timers.schedule(
                now.after(self.config.notice_duration_ms),
                Deferred::HideNotice { id: notice.id },
            );
            self.shown_notice = Some((notice.id, timer));
        }
    }

    /// Runs every continuation due at `now`, then shows pending notices.
    pub fn advance(&mut self, now: Millis) {
        while let Some((_, deferred)) = self.timers.pop_due(now) {
            self.run_deferred(deferred);
        }
        self.flush_notices(now);
    }

    fn run_deferred(&mut self, deferred: Deferred) {
        match deferred {
            Deferred::ArmPanelFocus { session } => self.arm_panel_focus(session),
            Deferred::RevealMarkers => self.init_markers(),
            Deferred::FocusMapAfterWelcome => {
                self.page.remove_welcome();
                if !self.page.focus(FocusTarget::MapContainer) {
                    tracing::warn!("map container could not take focus");
                }
            }
            Deferred::HideNotice { id } => {
                if self.shown_notice.is_some_and(|(shown, _)| shown == id) {
                    self.shown_notice = None;
                    self.page.hide_notice(id);
                }
            }
        }
    }

    pub(crate) fn fly(&mut self, target: Viewport) {
        self.map.fly_to(target, !self.config.reduced_motion);
    }

    pub(crate) fn apply(&mut self, changes: Vec<MarkerChange>) {
        for change in changes {
            self.map.set_marker_state(change.marker, change.state);
        }
    }
}
