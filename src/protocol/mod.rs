//! Line protocol spoken with the native watcher process.
//!
//! Outgoing commands are single-line JSON objects. Incoming lines are plain
//! text: either the flush marker or `<uid>:<kind>:<relative path>`.

mod command;
mod line;

pub use command::{Command, RegisterRequest};
pub use line::{Incoming, FLUSH_MARKER};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Process-local identifier of one logical watch.
///
/// Assigned from a monotonic counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WatchId(u64);

impl WatchId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for WatchId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| ProtocolError::InvalidId(s.to_string()))
    }
}

/// Kind of file system change reported by the watcher process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A file or directory appeared.
    Create,
    /// File contents or metadata changed.
    Change,
    /// A file or directory was removed.
    Delete,
}

impl EventKind {
    /// Every kind, in wire order.
    pub const ALL: [Self; 3] = [Self::Create, Self::Change, Self::Delete];

    /// The wire token for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Change => "change",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "change" => Ok(Self::Change),
            "delete" => Ok(Self::Delete),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}
