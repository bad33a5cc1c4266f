//! Manual selection: marker activation, the detail panel, and focus restore.

use catalog::Location;
use foundation::geo::Viewport;
use foundation::time::Millis;
use scene::MarkerId;

use crate::explorer::{Deferred, Explorer};
use crate::focus::FocusTarget;
use crate::surface::{MapSurface, Page};

impl<M: MapSurface, P: Page> Explorer<M, P> {
    /// The map started a viewport transition.
    pub fn on_motion_start(&mut self) {
        self.animating = true;
    }

    /// The map finished a viewport transition.
    pub fn on_motion_end(&mut self) {
        self.animating = false;
    }

    /// A marker was clicked or activated from the keyboard.
    ///
    /// Dropped (not queued) while the map is in motion or a tour owns the
    /// markers. Activating the selected marker again closes the panel.
    pub fn handle_marker_activated(&mut self, marker: MarkerId, now: Millis) {
        if self.animating {
            self.metrics.inc("activations_dropped_in_motion");
            tracing::debug!(marker = marker.index(), "activation dropped: map in motion");
            return;
        }
        if self.stage.mode().is_tour() {
            self.metrics.inc("activations_dropped_in_tour");
            tracing::debug!(marker = marker.index(), "activation dropped: tour active");
            return;
        }
        if !self.stage.registry().contains(marker) {
            tracing::warn!(marker = marker.index(), "activation for unknown marker");
            return;
        }
        if self.stage.mode().selection() == Some(marker) {
            self.handle_close_requested();
            return;
        }

        let store = self.store.clone();
        let Some(location) = store.get(marker.index()) else {
            tracing::warn!(marker = marker.index(), "no location behind marker");
            return;
        };

        self.fly(Viewport::new(location.position(), self.config.detail_zoom));
        self.open_panel(location, now);
        match self.stage.select(marker) {
            Ok(changes) => self.apply(changes),
            Err(err) => tracing::warn!(error = %err, "selection refused"),
        }
        self.map.set_dragging(false);
        self.map.set_scroll_zoom(false);
        self.metrics.inc("panel_opened");
    }

    /// Close control, Escape, or a repeated marker activation.
    ///
    /// Does nothing unless a manual selection or the panel is live.
    pub fn handle_close_requested(&mut self) {
        let previous = self.stage.mode().selection();
        if previous.is_none() && !self.panel.is_open() {
            return;
        }

        self.close_panel();
        self.restore_focus(previous);
        let changes = self.stage.clear_selection();
        self.apply(changes);
        self.fly(self.config.overview);
        self.map.set_dragging(true);
        self.map.set_scroll_zoom(true);
    }

    pub(crate) fn open_panel(&mut self, location: &Location, now: Millis) {
        let content = self.panel.render(location, &self.config.images);
        self.page.render_panel(&content);

        let (session, superseded) = self.panel.open();
        if let Some(timer) = superseded {
            self.timers.cancel(timer);
        }
        self.page.set_panel_visible(true);
        self.page.set_background_locked(true);

        let timer = self.timers.schedule(
            now.after(self.config.focus_trap_delay_ms),
            Deferred::ArmPanelFocus { session },
        );
        self.panel.set_pending_arm(timer);
    }

    /// Hides the panel and drops its trap. Focus is the caller's concern.
    pub(crate) fn close_panel(&mut self) {
        if let Some(timer) = self.panel.close() {
            self.timers.cancel(timer);
        }
        self.page.set_panel_visible(false);
        self.page.set_background_locked(false);
    }

    pub(crate) fn arm_panel_focus(&mut self, session: u64) {
        if !self.panel.is_open() || self.panel.session() != session {
            return;
        }
        if !self.page.focus(FocusTarget::PanelClose) {
            tracing::warn!("panel close control could not take focus");
        }
        let focusables = self.page.panel_focusables();
        self.panel.arm(session, &focusables);
    }

    fn restore_focus(&mut self, previous: Option<MarkerId>) {
        if let Some(marker) = previous {
            let target = FocusTarget::Marker(marker);
            if self.page.is_attached(target) && self.page.focus(target) {
                return;
            }
        }
        if !self.page.focus(FocusTarget::MapContainer) {
            tracing::warn!("focus could not be restored to the map container");
        }
    }
}
