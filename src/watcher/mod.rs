//! Logical file watches multiplexed onto one native watcher process.
//!
//! This module provides:
//! - The watch registry and its id allocation
//! - Per-watch event batching between flush markers
//! - The controller that owns the watcher process lifecycle

mod aggregator;
mod controller;
mod events;
mod registry;
mod stats;

pub use aggregator::EventAggregator;
pub use controller::{ControllerConfig, WatchController, WatchHandle};
pub use events::{ChannelSink, EventBatch, FileChange, WatchSink};
pub use registry::{WatchEntry, WatchRegistry};
pub use stats::{ControllerStats, ControllerStatsSnapshot};
