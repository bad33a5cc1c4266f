/// Host-supplied monotonic timestamp in milliseconds.
///
/// Nothing in the core reads a wall clock; every time-dependent operation takes
/// the current `Millis` from the caller so behavior can be replayed in tests.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Millis(pub u64);

impl Millis {
    pub const ZERO: Millis = Millis(0);

    pub fn after(self, delay_ms: u64) -> Self {
        Millis(self.0.saturating_add(delay_ms))
    }

    pub fn since(self, earlier: Millis) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

#[cfg(test)]
mod tests {
    use super::Millis;

    #[test]
    fn after_saturates() {
        assert_eq!(Millis(5).after(10), Millis(15));
        assert_eq!(Millis(u64::MAX).after(1), Millis(u64::MAX));
    }

    #[test]
    fn since_never_underflows() {
        assert_eq!(Millis(10).since(Millis(4)), 6);
        assert_eq!(Millis(4).since(Millis(10)), 0);
    }
}
