use scene::MarkerId;

/// A keyboard focus destination the explorer knows how to name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FocusTarget {
    Marker(MarkerId),
    PanelClose,
    /// Any other focusable element inside the panel, by tab position.
    PanelControl(u32),
    /// Fallback target; always present while the page lives.
    MapContainer,
}

/// Tab-wrapping confinement for the open panel.
///
/// Obtained from [`FocusTrap::install`] and given up with
/// [`FocusTrap::release`]. The panel owns at most one trap at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a trap only confines Tab while its owner holds it"]
pub struct FocusTrap {
    first: FocusTarget,
    last: FocusTarget,
}

impl FocusTrap {
    /// Returns `None` when there is nothing focusable to confine focus to.
    pub fn install(focusables: &[FocusTarget]) -> Option<Self> {
        let first = *focusables.first()?;
        let last = *focusables.last()?;
        tracing::trace!(?first, ?last, "focus trap installed");
        Some(Self { first, last })
    }

    pub fn first(&self) -> FocusTarget {
        self.first
    }

    pub fn last(&self) -> FocusTarget {
        self.last
    }

    /// Where a Tab press should go instead of the browser default, if anywhere.
    pub fn redirect(&self, focused: Option<FocusTarget>, shift: bool) -> Option<FocusTarget> {
        match (shift, focused) {
            (true, Some(f)) if f == self.first => Some(self.last),
            (false, Some(f)) if f == self.last => Some(self.first),
            _ => None,
        }
    }

    pub fn release(self) {
        tracing::trace!("focus trap released");
    }
}
