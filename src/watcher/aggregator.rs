//! Per-watch batching of change events between flush markers.

use std::collections::BTreeMap;

use super::events::{EventBatch, FileChange};
use crate::protocol::WatchId;

/// Accumulates events per watch until the watcher process flushes.
#[derive(Debug, Default)]
pub struct EventAggregator {
    pending: BTreeMap<WatchId, EventBatch>,
}

impl EventAggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one event, keeping arrival order within the watch.
    pub fn push(&mut self, id: WatchId, change: FileChange) {
        self.pending.entry(id).or_default().push(change);
    }

    /// Take every pending batch, leaving the aggregator empty.
    pub fn take(&mut self) -> BTreeMap<WatchId, EventBatch> {
        std::mem::take(&mut self.pending)
    }

    /// Number of watches with queued events.
    #[cfg(test)]
    fn pending_watches(&self) -> usize {
        self.pending.len()
    }

    /// Total number of queued events.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.pending.values().map(Vec::len).sum()
    }

    /// Whether nothing is queued.
    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
