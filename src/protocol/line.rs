//! Incoming line classification.

use super::{EventKind, WatchId};
use crate::error::ProtocolError;

/// Sentinel line closing one debounce cycle.
pub const FLUSH_MARKER: &str = "<flush>";

/// A decoded line from the watcher process stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// Deliver everything queued since the previous marker.
    Flush,
    /// One change under a registered root.
    Event {
        uid: WatchId,
        kind: EventKind,
        relative_path: String,
    },
}

impl Incoming {
    /// Parse a line that already had its trailing whitespace stripped.
    ///
    /// Only the first two colons delimit fields; the path keeps the rest.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] for lines that are neither the flush
    /// marker nor a well-formed event line.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        if line == FLUSH_MARKER {
            return Ok(Self::Flush);
        }

        let Some((uid, rest)) = line.split_once(':') else {
            return Err(ProtocolError::MissingDelimiter(line.to_string()));
        };
        let Some((kind, relative_path)) = rest.split_once(':') else {
            return Err(ProtocolError::Truncated(line.to_string()));
        };

        Ok(Self::Event {
            uid: uid.parse()?,
            kind: kind.parse()?,
            relative_path: relative_path.to_string(),
        })
    }
}
