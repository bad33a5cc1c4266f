use explorer::{MapSurface, MarkerSpec};
use foundation::geo::Viewport;
use scene::{MarkerId, MarkerState};
use wasm_bindgen::prelude::*;

use crate::{UiEvent, dispatch};

#[wasm_bindgen(module = "/js/map_bridge.js")]
extern "C" {
    #[wasm_bindgen(js_name = createMap, catch)]
    fn create_map(
        container_id: &str,
        lat: f64,
        lng: f64,
        zoom: f64,
        min_zoom: f64,
        max_zoom: f64,
        on_motion_start: &js_sys::Function,
        on_motion_end: &js_sys::Function,
    ) -> Result<(), JsValue>;

    #[wasm_bindgen(js_name = flyTo, catch)]
    fn fly_to(lat: f64, lng: f64, zoom: f64, animate: bool) -> Result<(), JsValue>;

    #[wasm_bindgen(js_name = setDragging, catch)]
    fn set_dragging(enabled: bool) -> Result<(), JsValue>;

    #[wasm_bindgen(js_name = setScrollZoom, catch)]
    fn set_scroll_zoom(enabled: bool) -> Result<(), JsValue>;

    #[wasm_bindgen(js_name = zoomIn, catch)]
    fn zoom_in() -> Result<(), JsValue>;

    #[wasm_bindgen(js_name = zoomOut, catch)]
    fn zoom_out() -> Result<(), JsValue>;

    #[wasm_bindgen(js_name = addMarker, catch)]
    fn add_marker(
        index: usize,
        lat: f64,
        lng: f64,
        title: &str,
        label: &str,
        delay_seconds: f64,
        on_activate: &js_sys::Function,
    ) -> Result<(), JsValue>;

    #[wasm_bindgen(js_name = setMarkerState, catch)]
    fn set_marker_state(index: usize, state: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(js_name = markerElement)]
    pub(crate) fn marker_element(index: usize) -> Option<web_sys::HtmlElement>;
}

/// Callbacks handed to Leaflet; they must outlive the map.
struct Bridge {
    _on_motion_start: Closure<dyn FnMut()>,
    _on_motion_end: Closure<dyn FnMut()>,
    on_activate: Closure<dyn FnMut(usize)>,
}

/// Leaflet-backed map surface. Motion and marker events are queued as
/// [`UiEvent`]s because Leaflet may fire them while the explorer is mid-call.
///
/// A map that failed to mount turns every call into a no-op.
pub struct LeafletMap {
    bridge: Option<Bridge>,
}

impl LeafletMap {
    pub fn new(
        container_id: &str,
        initial: Viewport,
        min_zoom: f64,
        max_zoom: f64,
    ) -> Result<Self, JsValue> {
        let on_motion_start = Closure::<dyn FnMut()>::new(|| dispatch(UiEvent::MotionStart));
        let on_motion_end = Closure::<dyn FnMut()>::new(|| dispatch(UiEvent::MotionEnd));
        let on_activate =
            Closure::<dyn FnMut(usize)>::new(|index| dispatch(UiEvent::MarkerActivated(index)));
        create_map(
            container_id,
            initial.center.lat,
            initial.center.lng,
            initial.zoom,
            min_zoom,
            max_zoom,
            on_motion_start.as_ref().unchecked_ref(),
            on_motion_end.as_ref().unchecked_ref(),
        )?;
        Ok(Self {
            bridge: Some(Bridge {
                _on_motion_start: on_motion_start,
                _on_motion_end: on_motion_end,
                on_activate,
            }),
        })
    }

    pub fn unavailable() -> Self {
        Self { bridge: None }
    }

    fn call(&self, op: &'static str, f: impl FnOnce() -> Result<(), JsValue>) {
        if self.bridge.is_none() {
            return;
        }
        if let Err(err) = f() {
            tracing::warn!(op, ?err, "map call failed");
        }
    }
}

impl MapSurface for LeafletMap {
    fn fly_to(&mut self, target: Viewport, animate: bool) {
        self.call("fly_to", || {
            fly_to(target.center.lat, target.center.lng, target.zoom, animate)
        });
    }

    fn set_dragging(&mut self, enabled: bool) {
        self.call("set_dragging", || set_dragging(enabled));
    }

    fn set_scroll_zoom(&mut self, enabled: bool) {
        self.call("set_scroll_zoom", || set_scroll_zoom(enabled));
    }

    fn zoom_in(&mut self) {
        self.call("zoom_in", zoom_in);
    }

    fn zoom_out(&mut self) {
        self.call("zoom_out", zoom_out);
    }

    fn add_markers(&mut self, markers: &[MarkerSpec]) {
        let Some(bridge) = &self.bridge else {
            return;
        };
        let on_activate: &js_sys::Function = bridge.on_activate.as_ref().unchecked_ref();
        for spec in markers {
            if let Err(err) = add_marker(
                spec.marker.index(),
                spec.position.lat,
                spec.position.lng,
                &spec.title,
                &spec.label,
                spec.reveal_delay_s,
                on_activate,
            ) {
                tracing::warn!(index = spec.marker.index(), ?err, "marker could not be added");
            }
        }
    }

    fn set_marker_state(&mut self, marker: MarkerId, state: MarkerState) {
        self.call("set_marker_state", || set_marker_state(marker.index(), state.as_str()));
    }
}
