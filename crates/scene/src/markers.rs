use foundation::handles::Handle;

/// Opaque reference to one interactive marker, bound by index to a location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub Handle);

impl MarkerId {
    pub fn from_index(index: usize) -> Self {
        MarkerId(Handle::new(index as u32, 0))
    }

    pub fn index(&self) -> usize {
        self.0.index() as usize
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum MarkerState {
    #[default]
    Normal,
    Dimmed,
    Active,
}

impl MarkerState {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkerState::Normal => "normal",
            MarkerState::Dimmed => "dimmed",
            MarkerState::Active => "active",
        }
    }
}

/// A visual-state transition that the map surface must apply.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MarkerChange {
    pub marker: MarkerId,
    pub state: MarkerState,
}

/// Visual state of every marker, in location-store order.
///
/// Invariant: at most one marker is `Active`; when one is, every other marker
/// is `Dimmed`; otherwise all are `Normal`. Only [`crate::MarkerStage`] mutates
/// the registry so the invariant cannot be broken from outside.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerRegistry {
    states: Vec<MarkerState>,
}

impl MarkerRegistry {
    pub fn new(count: usize) -> Self {
        Self {
            states: vec![MarkerState::Normal; count],
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn id(&self, index: usize) -> Option<MarkerId> {
        (index < self.states.len()).then(|| MarkerId::from_index(index))
    }

    pub fn contains(&self, marker: MarkerId) -> bool {
        marker.0.generation() == 0 && marker.index() < self.states.len()
    }

    pub fn state(&self, marker: MarkerId) -> Option<MarkerState> {
        if !self.contains(marker) {
            return None;
        }
        self.states.get(marker.index()).copied()
    }

    pub fn active(&self) -> Option<MarkerId> {
        self.states
            .iter()
            .position(|s| *s == MarkerState::Active)
            .map(MarkerId::from_index)
    }

    /// Iterates `(marker, state)` in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, MarkerState)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, s)| (MarkerId::from_index(i), *s))
    }

    /// Sets `marker` active and all others dimmed. Returns only the markers whose
    /// state actually changed.
    pub(crate) fn highlight(&mut self, marker: MarkerId) -> Vec<MarkerChange> {
        let target = marker.index();
        self.assign(|i| {
            if i == target {
                MarkerState::Active
            } else {
                MarkerState::Dimmed
            }
        })
    }

    pub(crate) fn reset(&mut self) -> Vec<MarkerChange> {
        self.assign(|_| MarkerState::Normal)
    }

    fn assign(&mut self, next: impl Fn(usize) -> MarkerState) -> Vec<MarkerChange> {
        let mut changes = Vec::new();
        for (i, state) in self.states.iter_mut().enumerate() {
            let want = next(i);
            if *state != want {
                *state = want;
                changes.push(MarkerChange {
                    marker: MarkerId::from_index(i),
                    state: want,
                });
            }
        }
        changes
    }
}
