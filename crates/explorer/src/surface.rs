//! Collaborator contracts: the map engine and the page.
//!
//! Both are driven synchronously from the explorer. Asynchronous completions
//! (viewport motion, image load) come back through `Explorer` entry points.

use foundation::geo::{LatLng, Viewport};
use runtime::Notice;
use scene::{MarkerId, MarkerState};

use crate::focus::FocusTarget;
use crate::panel::PanelContent;
use crate::tour::TourCard;

/// Everything the map needs to create one interactive marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub marker: MarkerId,
    pub position: LatLng,
    /// Tooltip and marker title.
    pub title: String,
    /// Accessible label of the marker's button.
    pub label: String,
    /// Entrance animation delay, seconds.
    pub reveal_delay_s: f64,
}

pub trait MapSurface {
    /// Starts a viewport transition. Motion start/end are reported back via
    /// `Explorer::on_motion_start` / `on_motion_end`, possibly re-entrantly.
    fn fly_to(&mut self, target: Viewport, animate: bool);
    fn set_dragging(&mut self, enabled: bool);
    fn set_scroll_zoom(&mut self, enabled: bool);
    fn zoom_in(&mut self);
    fn zoom_out(&mut self);
    fn add_markers(&mut self, markers: &[MarkerSpec]);
    /// Applies a visual state; `aria-expanded` mirrors `Active`.
    fn set_marker_state(&mut self, marker: MarkerId, state: MarkerState);
}

pub trait Page {
    /// Replaces the panel body wholesale.
    fn render_panel(&mut self, content: &PanelContent);
    fn set_panel_image(&mut self, src: &str);
    fn set_panel_image_loading(&mut self, loading: bool);
    fn set_panel_visible(&mut self, visible: bool);
    /// Locks page scrolling and interaction behind the panel.
    fn set_background_locked(&mut self, locked: bool);

    /// Focusable elements inside the panel, in tab order.
    fn panel_focusables(&self) -> Vec<FocusTarget>;
    fn focused(&self) -> Option<FocusTarget>;
    /// Whether the element exists and is attached to the visible tree.
    fn is_attached(&self, target: FocusTarget) -> bool;
    /// Returns `false` if the element could not take focus.
    fn focus(&mut self, target: FocusTarget) -> bool;

    fn set_tour_entry_visible(&mut self, visible: bool);
    fn render_tour_card(&mut self, card: &TourCard);
    fn remove_tour_card(&mut self);

    /// Starts the welcome overlay's fade-out.
    fn hide_welcome(&mut self);
    /// Takes the faded overlay out of layout and the accessibility tree.
    fn remove_welcome(&mut self);

    fn show_notice(&mut self, notice: &Notice);
    fn hide_notice(&mut self, id: u64);
}
