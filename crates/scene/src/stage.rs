use thiserror::Error;

use crate::markers::{MarkerChange, MarkerId, MarkerRegistry};

/// Which navigation mode currently owns the marker visuals.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum InteractionMode {
    #[default]
    Idle,
    ManualSelection(MarkerId),
    TourActive { index: usize, expanded: bool },
}

impl InteractionMode {
    pub fn is_tour(&self) -> bool {
        matches!(self, InteractionMode::TourActive { .. })
    }

    pub fn selection(&self) -> Option<MarkerId> {
        match self {
            InteractionMode::ManualSelection(m) => Some(*m),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeError {
    #[error("manual selection is disabled while the tour is active")]
    TourActive,
    #[error("the tour is not active")]
    TourInactive,
    #[error("unknown marker index {0}")]
    UnknownMarker(usize),
}

/// Single dispatcher for every marker visual-state mutation.
///
/// Manual selection and the guided tour both drive the same registry; routing
/// both through here guarantees at most one mode is live at a time.
#[derive(Debug, Clone, Default)]
pub struct MarkerStage {
    registry: MarkerRegistry,
    mode: InteractionMode,
}

impl MarkerStage {
    pub fn new(registry: MarkerRegistry) -> Self {
        Self {
            registry,
            mode: InteractionMode::Idle,
        }
    }

    pub fn registry(&self) -> &MarkerRegistry {
        &self.registry
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Manually selects `marker`. Refused while a tour owns the markers.
    pub fn select(&mut self, marker: MarkerId) -> Result<Vec<MarkerChange>, ModeError> {
        if self.mode.is_tour() {
            return Err(ModeError::TourActive);
        }
        if !self.registry.contains(marker) {
            return Err(ModeError::UnknownMarker(marker.index()));
        }
        self.mode = InteractionMode::ManualSelection(marker);
        tracing::debug!(marker = marker.index(), "manual selection");
        Ok(self.registry.highlight(marker))
    }

    /// Clears a manual selection. No-op in any other mode.
    pub fn clear_selection(&mut self) -> Vec<MarkerChange> {
        if self.mode.selection().is_none() {
            return Vec::new();
        }
        self.mode = InteractionMode::Idle;
        self.registry.reset()
    }

    /// Hands the markers to the tour at step 0, dropping any manual selection.
    ///
    /// The step's highlight is applied separately by [`MarkerStage::show_step`].
    pub fn enter_tour(&mut self) -> Vec<MarkerChange> {
        self.mode = InteractionMode::TourActive {
            index: 0,
            expanded: false,
        };
        self.registry.reset()
    }

    /// Moves the tour to `index`, collapsing the card and highlighting the stop.
    pub fn show_step(&mut self, index: usize) -> Result<Vec<MarkerChange>, ModeError> {
        if !self.mode.is_tour() {
            return Err(ModeError::TourInactive);
        }
        let marker = self.registry.id(index).ok_or(ModeError::UnknownMarker(index))?;
        self.mode = InteractionMode::TourActive {
            index,
            expanded: false,
        };
        Ok(self.registry.highlight(marker))
    }

    /// Flips the tour card's expanded flag and returns the new value.
    pub fn toggle_expanded(&mut self) -> Option<bool> {
        match &mut self.mode {
            InteractionMode::TourActive { expanded, .. } => {
                *expanded = !*expanded;
                Some(*expanded)
            }
            _ => None,
        }
    }

    /// Leaves the tour and returns every marker to normal.
    pub fn exit_tour(&mut self) -> Vec<MarkerChange> {
        if !self.mode.is_tour() {
            return Vec::new();
        }
        self.mode = InteractionMode::Idle;
        self.registry.reset()
    }
}
