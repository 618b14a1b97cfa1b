//! Counters describing controller activity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Statistics for the watch controller.
#[derive(Debug, Default)]
pub struct ControllerStats {
    pub lines_received: AtomicU64,
    pub events_queued: AtomicU64,
    pub batches_delivered: AtomicU64,
    pub batches_dropped: AtomicU64,
    pub protocol_errors: AtomicU64,
    pub process_starts: AtomicU64,
    pub process_exits: AtomicU64,
}

impl ControllerStats {
    /// Create new stats tracker.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Increment one counter.
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> ControllerStatsSnapshot {
        ControllerStatsSnapshot {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            events_queued: self.events_queued.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            process_starts: self.process_starts.load(Ordering::Relaxed),
            process_exits: self.process_exits.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of controller stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStatsSnapshot {
    pub lines_received: u64,
    pub events_queued: u64,
    pub batches_delivered: u64,
    pub batches_dropped: u64,
    pub protocol_errors: u64,
    pub process_starts: u64,
    pub process_exits: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_snapshot() {
        let stats = ControllerStats::new();
        assert_eq!(stats.snapshot(), ControllerStatsSnapshot::default());

        ControllerStats::bump(&stats.lines_received);
        ControllerStats::bump(&stats.lines_received);
        ControllerStats::bump(&stats.batches_dropped);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.lines_received, 2);
        assert_eq!(snapshot.batches_dropped, 1);
        assert_eq!(snapshot.batches_delivered, 0);
    }
}
