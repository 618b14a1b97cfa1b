//! watchmux - multiplexed file watching
//!
//! Registers one watch per root directory on a shared watcher process and
//! prints every delivered batch until interrupted.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use watchmux::config::{resolve_binary_path, BINARY_NAME};
use watchmux::observability::init_tracing;
use watchmux::{ChannelSink, Config, EventKind, Result, WatchController, WatchHandle};

/// watchmux - multiplexed file watching
#[derive(Parser, Debug)]
#[command(name = "watchmux")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root directories to watch
    #[arg(required = true)]
    roots: Vec<PathBuf>,

    /// Path to the native watcher executable
    #[arg(short, long, env = "WATCHMUX_BINARY")]
    binary: Option<PathBuf>,

    /// Directory holding per-platform watcher builds (`<platform>-<arch>/rust-watcher`)
    #[arg(long, env = "WATCHMUX_BINARY_DIR", conflicts_with = "binary")]
    binary_dir: Option<PathBuf>,

    /// Include globs, relative to each root
    #[arg(short, long, value_delimiter = ',', default_value = "**/*")]
    pattern: Vec<String>,

    /// Exclude globs, relative to each root
    #[arg(short, long, value_delimiter = ',')]
    ignore: Vec<String>,

    /// Event kinds to report
    #[arg(short, long, value_delimiter = ',', default_value = "create,change,delete")]
    events: Vec<EventKind>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "WATCHMUX_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "WATCHMUX_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    let binary = match (cli.binary, cli.binary_dir) {
        (Some(binary), _) => binary,
        (None, Some(dir)) => resolve_binary_path(dir)?,
        (None, None) => PathBuf::from(BINARY_NAME),
    };

    let cwd = std::env::current_dir()?;
    let config = Config {
        binary,
        roots: cli.roots.into_iter().map(|root| cwd.join(root)).collect(),
        patterns: cli.pattern,
        ignores: cli.ignore,
        events: cli.events,
        log_level: cli.log_level,
        log_json: cli.log_json,
        ..Config::default()
    };

    tracing::debug!(?config, "Configuration loaded");
    config.validate()?;

    let controller = WatchController::new(config.controller_config());
    let (batch_tx, batch_rx) = crossbeam_channel::unbounded();
    let sink = Arc::new(ChannelSink::new(batch_tx));

    let handles: Vec<WatchHandle> = config
        .roots
        .iter()
        .map(|root| {
            controller.create_watch(
                root.clone(),
                config.patterns.clone(),
                config.events.clone(),
                config.ignores.clone(),
                &sink,
            )
        })
        .collect();

    tracing::info!(
        watches = handles.len(),
        process = controller.has_process(),
        "Watching {} root(s)",
        config.roots.len()
    );

    let printer = tokio::task::spawn_blocking(move || {
        for batch in batch_rx {
            for change in batch {
                println!("{}\t{}", change.kind, change.path().display());
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("Interrupted, removing watches");

    for handle in handles {
        handle.destroy();
    }
    drop(sink);

    if let Err(e) = printer.await {
        tracing::warn!("Output task failed: {e}");
    }

    tracing::debug!(stats = ?controller.stats(), "Shut down");
    Ok(())
}
