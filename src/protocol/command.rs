//! Outgoing commands.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{EventKind, WatchId};
use crate::error::TransportError;

/// Payload of a `register` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    /// Absolute root directory of the watch.
    pub cwd: PathBuf,
    /// Event kinds the caller is interested in.
    pub events: Vec<EventKind>,
    /// Globs to exclude, relative to `cwd`.
    pub ignores: Vec<String>,
    /// Globs to include, relative to `cwd`.
    pub patterns: Vec<String>,
    /// Watch identifier echoed back on every event line.
    pub uid: WatchId,
}

/// A command sent to the watcher process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Start watching a root.
    Register(RegisterRequest),
    /// Stop watching the given uid.
    Unregister(WatchId),
}

impl Command {
    /// Encode the command as a single compact JSON line (no trailing newline).
    ///
    /// # Errors
    ///
    /// Returns an error if the root path is not valid UTF-8.
    pub fn to_line(&self) -> Result<String, TransportError> {
        serde_json::to_string(self).map_err(|e| TransportError::Encode(e.to_string()))
    }

    /// Decode a command line, as the watcher process would.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not a valid command object.
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}
