//! Aubade Server - headless scheduled playback daemon.
//!
//! Runs the playback coordinator, the history monitor and (when a feed is
//! configured) the holiday calendar sync against a JSON settings file.

mod settings_file;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use aubade_core::{
    bootstrap_services, BootstrapConfig, LogNotifier, MemorySessionStore, Notifier, SessionStore,
    SettingsStore,
};
use clap::Parser;
use tokio::signal;

use crate::settings_file::FileSettingsStore;

/// Aubade Server - scheduled Sonos playback automation.
#[derive(Parser, Debug)]
#[command(name = "aubade-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the settings file (JSON). Created with defaults if missing.
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "aubade-settings.json",
        env = "AUBADE_SETTINGS_FILE"
    )]
    settings: PathBuf,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "AUBADE_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Holiday calendar feed URL (iCalendar). Sync is disabled when unset.
    #[arg(long, env = "AUBADE_CALENDAR_URL")]
    calendar_url: Option<String>,

    /// Attempts per calendar sync before giving up until the next day.
    #[arg(long, default_value_t = 5, env = "AUBADE_CALENDAR_ATTEMPTS")]
    calendar_attempts: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Aubade Server v{}", env!("CARGO_PKG_VERSION"));

    let settings_store = FileSettingsStore::new(&args.settings);
    settings_store
        .ensure_exists()
        .await
        .context("Failed to prepare settings file")?;
    log::info!("Using settings file: {}", args.settings.display());

    let services = bootstrap_services(
        Arc::new(settings_store) as Arc<dyn SettingsStore>,
        Arc::new(MemorySessionStore::new()) as Arc<dyn SessionStore>,
        Arc::new(LogNotifier) as Arc<dyn Notifier>,
        BootstrapConfig {
            calendar_url: args.calendar_url,
            calendar_max_attempts: args.calendar_attempts,
        },
    );

    let handles = services.spawn();
    log::info!("Background tasks started");

    shutdown_signal().await;
    log::info!("Shutdown signal received, cleaning up...");

    services.shutdown();
    for handle in handles {
        if let Err(e) = handle.await {
            log::warn!("Background task ended abnormally: {}", e);
        }
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
