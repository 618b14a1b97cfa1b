//! Configuration settings and validation.

use crate::protocol::EventKind;
use crate::transport::WatcherBinary;
use crate::watcher::ControllerConfig;
use crate::{Error, Result};
use std::path::PathBuf;

/// Main configuration for the watchmux host binary.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the native watcher executable.
    pub binary: PathBuf,

    /// Extra arguments passed to the watcher executable.
    pub binary_args: Vec<String>,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON.
    pub log_json: bool,

    /// Root directories to watch, one watch per root.
    pub roots: Vec<PathBuf>,

    /// Include globs applied to every root.
    pub patterns: Vec<String>,

    /// Exclude globs applied to every root.
    pub ignores: Vec<String>,

    /// Event kinds to report.
    pub events: Vec<EventKind>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(crate::config::BINARY_NAME),
            binary_args: Vec::new(),
            log_level: "info".to_string(),
            log_json: false,
            roots: Vec::new(),
            patterns: vec!["**/*".to_string()],
            ignores: Vec::new(),
            events: EventKind::ALL.to_vec(),
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.binary.as_os_str().is_empty() {
            return Err(Error::config("watcher binary path cannot be empty"));
        }

        if self.roots.is_empty() {
            return Err(Error::config("at least one root directory is required"));
        }

        if let Some(root) = self.roots.iter().find(|root| !root.is_absolute()) {
            return Err(Error::config(format!(
                "root '{}' must be an absolute path",
                root.display()
            )));
        }

        if self.events.is_empty() {
            return Err(Error::config("at least one event kind is required"));
        }

        Ok(())
    }

    /// Controller configuration derived from these settings.
    #[must_use]
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig::new(
            WatcherBinary::new(&self.binary).with_args(self.binary_args.iter().cloned()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            roots: vec![PathBuf::from("/srv/project")],
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.events, EventKind::ALL.to_vec());
        assert!(config.validate().is_err(), "no roots configured");
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = Config {
            log_level: "verbose".to_string(),
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log level"));
    }

    #[test]
    fn test_log_level_case_insensitive() {
        for level in ["TRACE", "Debug", "INFO", "Warn", "ERROR"] {
            let config = Config {
                log_level: level.to_string(),
                ..valid()
            };
            assert!(
                config.validate().is_ok(),
                "Level '{level}' should be valid (case insensitive)"
            );
        }
    }

    #[test]
    fn test_validate_relative_root() {
        let config = Config {
            roots: vec![PathBuf::from("relative/dir")],
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn test_validate_empty_binary() {
        let config = Config {
            binary: PathBuf::new(),
            ..valid()
        };
        assert!(config.validate().unwrap_err().to_string().contains("binary"));
    }

    #[test]
    fn test_validate_no_events() {
        let config = Config {
            events: Vec::new(),
            ..valid()
        };
        assert!(config.validate().unwrap_err().to_string().contains("event"));
    }

    #[test]
    fn test_controller_config() {
        let config = Config {
            binary: PathBuf::from("/opt/watcher"),
            binary_args: vec!["--verbose".to_string()],
            ..valid()
        };
        let controller = config.controller_config();
        assert_eq!(controller.binary.program, PathBuf::from("/opt/watcher"));
        assert_eq!(controller.binary.args, vec!["--verbose".to_string()]);
    }
}
