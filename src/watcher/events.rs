//! File change events and the sinks that receive them.

#![allow(clippy::missing_const_for_fn)]

use std::path::{Path, PathBuf};

use crossbeam_channel::Sender;

use crate::protocol::EventKind;

/// One change under a watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// What happened.
    pub kind: EventKind,
    /// Absolute path: the watch root joined with the reported relative path.
    pub path: PathBuf,
}

impl FileChange {
    /// Build an event from a root and a root-relative path.
    #[must_use]
    pub fn new(kind: EventKind, root: &Path, relative_path: &str) -> Self {
        Self {
            kind,
            path: root.join(relative_path),
        }
    }

    /// The absolute path of the change.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Changes for one watch collected during one flush cycle, in arrival order.
pub type EventBatch = Vec<FileChange>;

/// Receiver of batched changes for one watch.
///
/// The controller only holds a weak reference; the caller keeps the sink
/// alive for as long as it wants notifications. `notify` is called at most
/// once per flush cycle and never concurrently for the same watch.
pub trait WatchSink: Send + Sync {
    /// Deliver one batch.
    fn notify(&self, batch: EventBatch);
}

/// Sink that forwards every batch into a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<EventBatch>,
}

impl ChannelSink {
    /// Forward batches to `tx`.
    #[must_use]
    pub fn new(tx: Sender<EventBatch>) -> Self {
        Self { tx }
    }
}

impl WatchSink for ChannelSink {
    fn notify(&self, batch: EventBatch) {
        if self.tx.send(batch).is_err() {
            tracing::debug!("Batch receiver dropped, discarding batch");
        }
    }
}
