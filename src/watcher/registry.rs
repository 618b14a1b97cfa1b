//! Table of active watch registrations.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use super::events::WatchSink;
use crate::protocol::{EventKind, RegisterRequest, WatchId};

/// One logical watch.
pub struct WatchEntry {
    /// Absolute root directory.
    pub root: PathBuf,
    /// Include globs.
    pub patterns: Vec<String>,
    /// Exclude globs.
    pub ignores: Vec<String>,
    /// Requested event kinds.
    pub events: Vec<EventKind>,
    sink: Weak<dyn WatchSink>,
}

impl WatchEntry {
    /// Upgrade the sink reference, or `None` if the owner dropped it.
    #[must_use]
    pub fn sink(&self) -> Option<Arc<dyn WatchSink>> {
        self.sink.upgrade()
    }

    /// The `register` command payload for this entry.
    #[must_use]
    pub fn register_request(&self, uid: WatchId) -> RegisterRequest {
        RegisterRequest {
            cwd: self.root.clone(),
            events: self.events.clone(),
            ignores: self.ignores.clone(),
            patterns: self.patterns.clone(),
            uid,
        }
    }
}

impl std::fmt::Debug for WatchEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchEntry")
            .field("root", &self.root)
            .field("patterns", &self.patterns)
            .field("ignores", &self.ignores)
            .field("events", &self.events)
            .field("sink_alive", &(self.sink.strong_count() > 0))
            .finish()
    }
}

/// Maps watch ids to their registration. Ids come from a counter that is
/// never decremented, so an id is never handed out twice.
#[derive(Debug, Default)]
pub struct WatchRegistry {
    last_id: u64,
    entries: HashMap<WatchId, WatchEntry>,
}

impl WatchRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id and store the registration.
    pub fn insert(
        &mut self,
        root: &Path,
        patterns: Vec<String>,
        ignores: Vec<String>,
        events: Vec<EventKind>,
        sink: Weak<dyn WatchSink>,
    ) -> WatchId {
        self.last_id += 1;
        let id = WatchId::new(self.last_id);
        self.entries.insert(
            id,
            WatchEntry {
                root: root.to_path_buf(),
                patterns,
                ignores,
                events,
                sink,
            },
        );
        id
    }

    /// Remove a registration.
    pub fn remove(&mut self, id: WatchId) -> Option<WatchEntry> {
        self.entries.remove(&id)
    }

    /// Look up a registration.
    #[must_use]
    pub fn get(&self, id: WatchId) -> Option<&WatchEntry> {
        self.entries.get(&id)
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no registration is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recently allocated id, if any.
    #[cfg(test)]
    fn last_id(&self) -> Option<WatchId> {
        (self.last_id > 0).then(|| WatchId::new(self.last_id))
    }
}
