//! Deterministic deferred continuations.
//!
//! The host owns the real clock (browser timers, animation frames). The core only
//! records *when* something should resume and drains what is due when the host
//! calls back with the current time.
//!
//! Ordering contract:
//! - Due entries pop in `(due, id)` order, so equal deadlines run in schedule order.
//! - Cancellation does not perturb the order of remaining entries.

use foundation::time::Millis;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(pub u64);

#[derive(Debug)]
struct Entry<T> {
    due: Millis,
    id: TimerId,
    payload: T,
}

#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    entries: Vec<Entry<T>>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn schedule(&mut self, due: Millis, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        // Keep entries sorted; insertion after all entries with `due <= new.due`
        // preserves schedule order for equal deadlines.
        let at = self.entries.partition_point(|e| e.due <= due);
        self.entries.insert(at, Entry { due, id, payload });
        id
    }

    /// Returns `true` if the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let Some(pos) = self.entries.iter().position(|e| e.id == id) else {
            return false;
        };
        self.entries.remove(pos);
        true
    }

    /// Earliest pending deadline, if any.
    pub fn next_due(&self) -> Option<Millis> {
        self.entries.first().map(|e| e.due)
    }

    /// Removes and returns the earliest entry due at or before `now`.
    pub fn pop_due(&mut self, now: Millis) -> Option<(TimerId, T)> {
        if self.entries.first().is_some_and(|e| e.due <= now) {
            let e = self.entries.remove(0);
            return Some((e.id, e.payload));
        }
        None
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
