//! Configuration management for watchmux.
//!
//! Supports configuration from:
//! - Command-line arguments (highest priority)
//! - Environment variables
//! - Platform defaults for locating the watcher binary

mod binary;
mod settings;

pub use binary::{binary_dir_name, resolve_binary_path, BINARY_NAME};
pub use settings::Config;
