//! Error types and Result aliases for watchmux.
//!
//! This module defines the error hierarchy used throughout the crate.
//! Fallible public functions return `Result<T, Error>` or `Result<T>`.
//! The controller itself never returns these to its callers; it logs them.

use thiserror::Error;

/// Result type alias using watchmux's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for watchmux operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Watcher process could not be started.
    #[error("spawn error: {0}")]
    Spawn(#[from] SpawnError),

    /// Line transport failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Malformed line received from the watcher process.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while starting the watcher process.
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The OS refused to create the process.
    #[error("failed to spawn '{program}': {reason}")]
    Launch { program: String, reason: String },

    /// The process started but one of its standard streams was not piped.
    #[error("watcher process has no {0} handle")]
    MissingPipe(&'static str),

    /// A reader thread could not be started.
    #[error("failed to start reader thread: {0}")]
    Thread(String),
}

/// Errors raised by the line transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Writing to the process stdin failed.
    #[error("failed to write to watcher process: {0}")]
    Write(String),

    /// Reading from the process stdout failed.
    #[error("failed to read from watcher process: {0}")]
    Read(String),

    /// The transport has already been closed.
    #[error("transport is closed")]
    Closed,

    /// Encoding an outgoing command failed.
    #[error("failed to encode command: {0}")]
    Encode(String),
}

/// Errors raised while interpreting a line from the watcher process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line contains no field delimiter at all.
    #[error("invalid watcher output: {0}")]
    MissingDelimiter(String),

    /// The line has a uid but no event kind / path separator.
    #[error("truncated event line: {0}")]
    Truncated(String),

    /// The uid field is not a decimal integer.
    #[error("invalid watch id '{0}'")]
    InvalidId(String),

    /// The event kind is outside the agreed vocabulary.
    #[error("unknown event kind '{0}'")]
    UnknownKind(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl SpawnError {
    /// Create a launch error for the given program.
    pub fn launch(program: impl Into<String>, reason: impl ToString) -> Self {
        Self::Launch {
            program: program.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests;
