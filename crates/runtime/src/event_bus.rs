use foundation::time::Millis;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        }
    }
}

/// A non-blocking, user-visible notification (rendered as a toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub at: Millis,
    pub level: NoticeLevel,
    pub message: String,
}

/// Pending notifications waiting for the host to present them.
///
/// Emitting never fails and never blocks; the host drains the bus when it is
/// ready to touch the page.
#[derive(Debug, Default)]
pub struct NoticeBus {
    next_id: u64,
    pending: Vec<Notice>,
}

impl NoticeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, at: Millis, level: NoticeLevel, message: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let message = message.into();
        tracing::debug!(id, level = level.as_str(), %message, "notice emitted");
        self.pending.push(Notice {
            id,
            at,
            level,
            message,
        });
        id
    }

    pub fn error(&mut self, at: Millis, message: impl Into<String>) -> u64 {
        self.emit(at, NoticeLevel::Error, message)
    }

    pub fn pending(&self) -> &[Notice] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::{NoticeBus, NoticeLevel};
    use foundation::time::Millis;

    #[test]
    fn records_notices_in_emit_order() {
        let mut bus = NoticeBus::new();
        bus.error(Millis(2), "Failed to load map data.");
        bus.emit(Millis(3), NoticeLevel::Info, "hello");
        let pending = bus.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].level, NoticeLevel::Error);
        assert_eq!(pending[0].at, Millis(2));
        assert!(pending[0].id < pending[1].id);
    }

    #[test]
    fn drain_clears_pending() {
        let mut bus = NoticeBus::new();
        bus.error(Millis(0), "m");
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.pending().is_empty());
    }
}
