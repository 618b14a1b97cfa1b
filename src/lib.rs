//! watchmux
//!
//! Lets many independent consumers watch different directory trees, each
//! with its own globs and event filters, while a single native watcher
//! subprocess does the actual file system monitoring.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod transport;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
pub use protocol::{EventKind, WatchId};
pub use watcher::{
    ChannelSink, ControllerConfig, EventBatch, FileChange, WatchController, WatchHandle, WatchSink,
};
