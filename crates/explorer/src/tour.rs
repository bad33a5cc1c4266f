//! Guided tour: a strict stepper over every location, in store order.

use catalog::Location;
use foundation::geo::Viewport;
use scene::InteractionMode;

use crate::explorer::Explorer;
use crate::focus::FocusTarget;
use crate::surface::{MapSurface, Page};

/// First sentence of `description`, always ending in a period.
pub fn synopsis(description: &str) -> String {
    let first = description.split('.').next().unwrap_or_default();
    format!("{}.", first.trim())
}

/// Everything the tour card shows for one stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TourCard {
    pub step: usize,
    pub total: usize,
    /// "Stop 2 of 7".
    pub progress_label: String,
    pub title: String,
    pub region: String,
    pub synopsis: String,
    pub description: String,
    pub image_src: String,
    pub image_alt: String,
    /// Full description and image are visible only when expanded; the
    /// synopsis only when collapsed.
    pub expanded: bool,
    pub toggle_label: &'static str,
    /// Element id tying the toggle's `aria-controls` to the details region.
    pub details_id: String,
    pub prev_enabled: bool,
    /// Whether the next control ends the tour instead of advancing.
    pub is_last: bool,
    pub next_label: &'static str,
}

impl TourCard {
    pub fn build(location: &Location, step: usize, total: usize, expanded: bool) -> Self {
        let is_last = step + 1 >= total;
        Self {
            step,
            total,
            progress_label: format!("Stop {} of {}", step + 1, total),
            title: location.name.clone(),
            region: location.region.clone(),
            synopsis: synopsis(&location.description),
            description: location.description.clone(),
            image_src: location.image_ref.clone(),
            image_alt: location.name.clone(),
            expanded,
            toggle_label: if expanded { "Show less" } else { "Tell me more" },
            details_id: format!("tour-details-{step}"),
            prev_enabled: step > 0,
            is_last,
            next_label: if is_last { "Finish" } else { "Next" },
        }
    }

    pub fn synopsis_visible(&self) -> bool {
        !self.expanded
    }

    pub fn details_visible(&self) -> bool {
        self.expanded
    }
}

impl<M: MapSurface, P: Page> Explorer<M, P> {
    /// `(step, expanded)` while the tour runs.
    pub fn tour_step(&self) -> Option<(usize, bool)> {
        match self.stage.mode() {
            InteractionMode::TourActive { index, expanded } => Some((index, expanded)),
            _ => None,
        }
    }

    /// Starts at the first stop. Ignored if already touring or there is
    /// nothing to tour.
    pub fn start_tour(&mut self) {
        if self.stage.mode().is_tour() {
            return;
        }
        if self.store.is_empty() {
            tracing::debug!("tour requested with no locations");
            return;
        }
        self.init_markers();
        self.page.set_tour_entry_visible(false);

        let had_selection = self.stage.mode().selection().is_some();
        if self.panel.is_open() {
            self.close_panel();
            // The close control is hidden now; the card is rebuilt below.
            if !self.page.focus(FocusTarget::MapContainer) {
                tracing::warn!("focus could not leave the closed panel");
            }
        }
        if had_selection {
            self.map.set_dragging(true);
            self.map.set_scroll_zoom(true);
        }

        let changes = self.stage.enter_tour();
        self.apply(changes);
        self.metrics.inc("tours_started");
        tracing::info!(stops = self.store.len(), "tour started");
        self.tour_go_to(0);
    }

    /// Jumps to stop `index`. Out-of-range indices and calls outside a tour
    /// change nothing.
    pub fn tour_go_to(&mut self, index: isize) {
        if !self.stage.mode().is_tour() {
            return;
        }
        let Some(index) = usize::try_from(index).ok().filter(|i| *i < self.store.len()) else {
            tracing::debug!(index, "tour step out of range");
            return;
        };
        let store = self.store.clone();
        let Some(location) = store.get(index) else {
            return;
        };

        let changes = match self.stage.show_step(index) {
            Ok(changes) => changes,
            Err(err) => {
                tracing::warn!(error = %err, "tour step refused");
                return;
            }
        };
        self.fly(Viewport::new(location.position(), self.config.detail_zoom));
        self.apply(changes);
        self.render_tour_card();
    }

    /// Advances one stop, or ends the tour from the last one.
    pub fn tour_next(&mut self) {
        let Some((step, _)) = self.tour_step() else {
            return;
        };
        if step + 1 >= self.store.len() {
            self.end_tour();
        } else {
            self.tour_go_to(step as isize + 1);
        }
    }

    pub fn tour_prev(&mut self) {
        if let Some((step, _)) = self.tour_step() {
            self.tour_go_to(step as isize - 1);
        }
    }

    pub fn tour_toggle_expand(&mut self) {
        if self.stage.toggle_expanded().is_some() {
            self.render_tour_card();
        }
    }

    pub fn end_tour(&mut self) {
        if !self.stage.mode().is_tour() {
            return;
        }
        self.page.remove_tour_card();
        self.page.set_tour_entry_visible(true);
        let changes = self.stage.exit_tour();
        self.apply(changes);
        self.fly(self.config.overview);
        tracing::info!("tour ended");
    }

    fn render_tour_card(&mut self) {
        let Some((step, expanded)) = self.tour_step() else {
            return;
        };
        let Some(location) = self.store.get(step) else {
            return;
        };
        let card = TourCard::build(location, step, self.store.len(), expanded);
        self.page.render_tour_card(&card);
    }
}

#[cfg(test)]
mod tests {
    use super::{synopsis, TourCard};
    use crate::focus::FocusTarget;
    use crate::testing::{explorer_with, MapCall};
    use foundation::geo::Viewport;
    use foundation::time::Millis;
    use pretty_assertions::assert_eq;
    use scene::{InteractionMode, MarkerId, MarkerState};

    #[test]
    fn synopsis_is_first_sentence() {
        assert_eq!(synopsis("One thing. Another thing."), "One thing.");
        assert_eq!(synopsis("No period"), "No period.");
        assert_eq!(synopsis(""), ".");
    }

    #[test]
    fn card_labels_follow_position() {
        let ex = explorer_with(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]);
        let loc = ex.store().get(0).unwrap();

        let first = TourCard::build(loc, 0, 3, false);
        assert_eq!(first.progress_label, "Stop 1 of 3");
        assert!(!first.prev_enabled);
        assert_eq!(first.next_label, "Next");
        assert_eq!(first.toggle_label, "Tell me more");
        assert_eq!(first.details_id, "tour-details-0");

        let last = TourCard::build(loc, 2, 3, true);
        assert!(last.prev_enabled);
        assert!(last.is_last);
        assert_eq!(last.next_label, "Finish");
        assert_eq!(last.toggle_label, "Show less");
        assert!(last.details_visible() && !last.synopsis_visible());
    }

    #[test]
    fn start_clears_manual_selection() {
        let mut ex = explorer_with(&[(0.0, 0.0), (10.0, 10.0)]);
        ex.init_markers();
        ex.handle_marker_activated(MarkerId::from_index(1), Millis(0));
        ex.start_tour();

        assert_eq!(
            ex.mode(),
            InteractionMode::TourActive {
                index: 0,
                expanded: false
            }
        );
        assert!(!ex.page().panel_visible);
        assert!(ex.panel().trap().is_none());
        assert!(!ex.page().tour_entry_visible);
        assert!(ex.map().dragging);
        assert_eq!(ex.markers().active(), Some(MarkerId::from_index(0)));
    }

    #[test]
    fn start_moves_focus_off_the_closed_panel() {
        let mut ex = explorer_with(&[(0.0, 0.0), (10.0, 10.0)]);
        ex.init_markers();
        ex.handle_marker_activated(MarkerId::from_index(1), Millis(0));
        ex.advance(Millis(100));
        assert_eq!(ex.page().focused, Some(FocusTarget::PanelClose));

        ex.start_tour();
        assert!(!ex.page().panel_visible);
        assert_eq!(ex.page().focused, Some(FocusTarget::MapContainer));
    }

    #[test]
    fn start_instantiates_markers_when_needed() {
        let mut ex = explorer_with(&[(0.0, 0.0), (10.0, 10.0)]);
        ex.start_tour();
        assert!(ex.markers_ready());
        assert_eq!(ex.map().states.get(&MarkerId::from_index(0)), Some(&MarkerState::Active));
    }

    #[test]
    fn start_with_no_locations_does_nothing() {
        let mut ex = explorer_with(&[]);
        ex.start_tour();
        assert_eq!(ex.mode(), InteractionMode::Idle);
        assert!(ex.page().tour_card.is_none());
        assert!(ex.map().calls.is_empty());
    }

    #[test]
    fn start_twice_is_ignored() {
        let mut ex = explorer_with(&[(0.0, 0.0), (10.0, 10.0)]);
        ex.start_tour();
        ex.tour_next();
        ex.start_tour();
        assert_eq!(ex.tour_step(), Some((1, false)));
    }

    #[test]
    fn out_of_range_steps_are_no_ops() {
        let mut ex = explorer_with(&[(0.0, 0.0), (10.0, 10.0)]);
        ex.start_tour();
        let card = ex.page().tour_card.clone();
        let calls = ex.map().calls.len();

        ex.tour_go_to(-1);
        ex.tour_go_to(2);
        ex.tour_prev();

        assert_eq!(ex.tour_step(), Some((0, false)));
        assert_eq!(ex.page().tour_card, card);
        assert_eq!(ex.map().calls.len(), calls);
    }

    #[test]
    fn toggle_twice_round_trips() {
        let mut ex = explorer_with(&[(0.0, 0.0), (10.0, 10.0)]);
        ex.start_tour();
        let original = ex.page().tour_card.clone().unwrap();

        ex.tour_toggle_expand();
        let expanded = ex.page().tour_card.clone().unwrap();
        assert!(expanded.details_visible());
        assert_eq!(expanded.step, original.step);

        ex.tour_toggle_expand();
        assert_eq!(ex.page().tour_card.clone().unwrap(), original);
    }

    #[test]
    fn marker_clicks_are_ignored_during_tour() {
        let mut ex = explorer_with(&[(0.0, 0.0), (10.0, 10.0)]);
        ex.start_tour();
        ex.handle_marker_activated(MarkerId::from_index(1), Millis(0));
        assert_eq!(ex.tour_step(), Some((0, false)));
        assert!(!ex.page().panel_visible);
        assert_eq!(ex.metrics().counter("activations_dropped_in_tour"), 1);
    }

    #[test]
    fn end_restores_overview_and_entry() {
        let mut ex = explorer_with(&[(0.0, 0.0), (10.0, 10.0)]);
        ex.start_tour();
        ex.end_tour();

        assert_eq!(ex.mode(), InteractionMode::Idle);
        assert!(ex.page().tour_card.is_none());
        assert!(ex.page().tour_entry_visible);
        assert!(ex.markers().iter().all(|(_, s)| s == MarkerState::Normal));
        assert_eq!(ex.map().last_flight(), Some((Viewport::at(2.8, 18.35, 4.0), true)));

        let flights = ex.map().calls.iter().filter(|c| matches!(c, MapCall::FlyTo(..))).count();
        ex.end_tour();
        assert_eq!(
            ex.map().calls.iter().filter(|c| matches!(c, MapCall::FlyTo(..))).count(),
            flights
        );
    }
}
