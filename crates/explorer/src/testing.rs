//! Recording fakes for the map and page collaborators.

use std::collections::{HashMap, HashSet};

use catalog::{Location, LocationStore};
use foundation::geo::Viewport;
use runtime::Notice;
use scene::{MarkerId, MarkerState};

use crate::config::ExplorerConfig;
use crate::explorer::Explorer;
use crate::focus::FocusTarget;
use crate::panel::PanelContent;
use crate::surface::{MapSurface, MarkerSpec, Page};
use crate::tour::TourCard;

#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    FlyTo(Viewport, bool),
    Dragging(bool),
    ScrollZoom(bool),
    ZoomIn,
    ZoomOut,
    AddMarkers(usize),
    SetMarkerState(MarkerId, MarkerState),
}

#[derive(Debug)]
pub struct RecordingMap {
    pub calls: Vec<MapCall>,
    pub markers: Vec<MarkerSpec>,
    pub states: HashMap<MarkerId, MarkerState>,
    pub dragging: bool,
    pub scroll_zoom: bool,
}

impl RecordingMap {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            markers: Vec::new(),
            states: HashMap::new(),
            dragging: true,
            scroll_zoom: true,
        }
    }

    pub fn last_flight(&self) -> Option<(Viewport, bool)> {
        self.calls.iter().rev().find_map(|c| match c {
            MapCall::FlyTo(v, animate) => Some((*v, *animate)),
            _ => None,
        })
    }
}

impl MapSurface for RecordingMap {
    fn fly_to(&mut self, target: Viewport, animate: bool) {
        self.calls.push(MapCall::FlyTo(target, animate));
    }

    fn set_dragging(&mut self, enabled: bool) {
        self.dragging = enabled;
        self.calls.push(MapCall::Dragging(enabled));
    }

    fn set_scroll_zoom(&mut self, enabled: bool) {
        self.scroll_zoom = enabled;
        self.calls.push(MapCall::ScrollZoom(enabled));
    }

    fn zoom_in(&mut self) {
        self.calls.push(MapCall::ZoomIn);
    }

    fn zoom_out(&mut self) {
        self.calls.push(MapCall::ZoomOut);
    }

    fn add_markers(&mut self, markers: &[MarkerSpec]) {
        self.markers.extend_from_slice(markers);
        self.calls.push(MapCall::AddMarkers(markers.len()));
    }

    fn set_marker_state(&mut self, marker: MarkerId, state: MarkerState) {
        self.states.insert(marker, state);
        self.calls.push(MapCall::SetMarkerState(marker, state));
    }
}

#[derive(Debug)]
pub struct RecordingPage {
    pub panel: Option<PanelContent>,
    pub panel_renders: usize,
    pub panel_visible: bool,
    pub background_locked: bool,
    pub image_src: Option<String>,
    pub image_loading: bool,
    pub focusables: Vec<FocusTarget>,
    pub focused: Option<FocusTarget>,
    pub detached: HashSet<FocusTarget>,
    pub tour_entry_visible: bool,
    pub tour_card: Option<TourCard>,
    pub welcome_hidden: bool,
    pub welcome_removed: bool,
    pub shown_notices: Vec<Notice>,
    pub hidden_notices: Vec<u64>,
}

impl RecordingPage {
    pub fn new() -> Self {
        Self {
            panel: None,
            panel_renders: 0,
            panel_visible: false,
            background_locked: false,
            image_src: None,
            image_loading: false,
            focusables: vec![FocusTarget::PanelClose, FocusTarget::PanelControl(1)],
            focused: None,
            detached: HashSet::new(),
            tour_entry_visible: true,
            tour_card: None,
            welcome_hidden: false,
            welcome_removed: false,
            shown_notices: Vec::new(),
            hidden_notices: Vec::new(),
        }
    }

    /// Messages of notices shown and not yet hidden.
    pub fn visible_notices(&self) -> Vec<String> {
        self.shown_notices
            .iter()
            .filter(|n| !self.hidden_notices.contains(&n.id))
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Page for RecordingPage {
    fn render_panel(&mut self, content: &PanelContent) {
        self.panel_renders += 1;
        self.image_src = Some(content.image.src.clone());
        self.image_loading = true;
        self.panel = Some(content.clone());
    }

    fn set_panel_image(&mut self, src: &str) {
        self.image_src = Some(src.to_string());
    }

    fn set_panel_image_loading(&mut self, loading: bool) {
        self.image_loading = loading;
    }

    fn set_panel_visible(&mut self, visible: bool) {
        self.panel_visible = visible;
    }

    fn set_background_locked(&mut self, locked: bool) {
        self.background_locked = locked;
    }

    fn panel_focusables(&self) -> Vec<FocusTarget> {
        self.focusables.clone()
    }

    fn focused(&self) -> Option<FocusTarget> {
        self.focused
    }

    fn is_attached(&self, target: FocusTarget) -> bool {
        !self.detached.contains(&target)
    }

    fn focus(&mut self, target: FocusTarget) -> bool {
        if !self.is_attached(target) {
            return false;
        }
        self.focused = Some(target);
        true
    }

    fn set_tour_entry_visible(&mut self, visible: bool) {
        self.tour_entry_visible = visible;
    }

    fn render_tour_card(&mut self, card: &TourCard) {
        self.tour_card = Some(card.clone());
    }

    fn remove_tour_card(&mut self) {
        self.tour_card = None;
    }

    fn hide_welcome(&mut self) {
        self.welcome_hidden = true;
    }

    fn remove_welcome(&mut self) {
        self.welcome_removed = true;
    }

    fn show_notice(&mut self, notice: &Notice) {
        self.shown_notices.push(notice.clone());
    }

    fn hide_notice(&mut self, id: u64) {
        self.hidden_notices.push(id);
    }
}

/// Locations named "A", "B", ... at the given coordinates.
pub fn store_with(points: &[(f64, f64)]) -> LocationStore {
    let locations = points
        .iter()
        .enumerate()
        .map(|(i, &(lat, lng))| {
            let name = ((b'A' + i as u8) as char).to_string();
            Location {
                description: format!("{name} is worth a visit. It has more to tell."),
                image_ref: format!("https://img.example.com/{}.jpg", name.to_lowercase()),
                region: format!("Region {name}"),
                name,
                lat,
                lng,
            }
        })
        .collect();
    LocationStore::new(locations).expect("test locations are valid")
}

pub fn explorer_with(points: &[(f64, f64)]) -> Explorer<RecordingMap, RecordingPage> {
    Explorer::new(
        ExplorerConfig::default(),
        store_with(points),
        RecordingMap::new(),
        RecordingPage::new(),
    )
}
