//! Paddock - a touchscreen F1 dashboard.
//!
//! Polls the Jolpica F1 API in the background, keeps the latest calendar and
//! standings in a JSON cache file, and serves a spoiler-protected web view of
//! it. `--mode summary` prints the cached data to the console instead.

mod handlers;
mod server;
mod summary;
mod view;

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use paddock_core::api::JolpicaClient;
use paddock_core::{CacheStore, Config, DataFetcher, Poller, Trigger};

use handlers::AppState;

// ============================================================================
// Constants
// ============================================================================

/// How long to wait for the poller to wind down after the server stops
const POLLER_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Log file name prefix inside the configured log directory
const LOG_FILE_PREFIX: &str = "paddock.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Serve the dashboard over HTTP
    Web,
    /// Print the cached dashboard and cache status, then exit
    Summary,
}

#[derive(Parser, Debug)]
#[command(name = "paddock", author, version, about, long_about = None)]
struct Args {
    #[arg(long, value_enum, default_value_t = Mode::Web)]
    mode: Mode,

    /// Port to listen on (default 5000)
    #[arg(short, long)]
    port: Option<u16>,

    /// Hours between data polls (default 12)
    #[arg(long)]
    poll_hours: Option<u64>,

    /// Path of the JSON cache file
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Fetch fresh data right away instead of waiting for the schedule
    #[arg(long)]
    force_update: bool,

    /// Address to bind (default 0.0.0.0)
    #[arg(long)]
    bind: Option<String>,

    /// Delete the cache file and exit
    #[arg(long, conflicts_with = "force_update")]
    clear_cache: bool,
}

impl Args {
    /// Command line flags win over the config file.
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(hours) = self.poll_hours {
            config.poll_hours = hours;
        }
        if let Some(ref path) = self.cache_file {
            config.cache_file = Some(path.clone());
        }
        if let Some(ref bind) = self.bind {
            config.bind = bind.clone();
        }
    }
}

/// Initialize the tracing subscriber for logging.
///
/// Returns the file writer guard when a log directory is configured; it must
/// live until exit so buffered lines are flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Resolve on Ctrl+C or SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let mut config = Config::load()?;
    args.apply(&mut config);
    config.validate()?;

    let _log_guard = init_tracing(config.log_dir.as_deref());
    info!(mode = ?args.mode, "Paddock starting");

    let store = CacheStore::new(config.cache_file());
    if args.clear_cache {
        if store.clear()? {
            println!("Removed {}", store.path().display());
        } else {
            println!("No cache at {}", store.path().display());
        }
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let client = JolpicaClient::new(&config.api_base_url)?;
    let fetcher = DataFetcher::new(Arc::new(client), config.request_spacing());
    let poller = Arc::new(Poller::new(
        fetcher,
        store,
        config.poller_settings(),
        shutdown.clone(),
    ));

    if args.mode == Mode::Summary {
        if args.force_update {
            poller.refresh(Trigger::Startup).await;
        }
        print!("{}", summary::render(&poller.payload().await, &poller.status().await));
        return Ok(());
    }

    let addr: SocketAddr = format!("{}:{}", config.bind, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address: {}:{}", config.bind, config.port))?;

    let poll_task = tokio::spawn(Arc::clone(&poller).run());

    if args.force_update {
        let poller = Arc::clone(&poller);
        tokio::spawn(async move {
            poller.refresh(Trigger::Startup).await;
        });
    }

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            info!("Shutdown signal received");
            shutdown.cancel();
        });
    }

    let served = server::serve(addr, AppState::new(Arc::clone(&poller)), shutdown.clone()).await;

    // Stop the poller whether the server exited cleanly or not
    shutdown.cancel();
    let timeout = Duration::from_secs(POLLER_SHUTDOWN_TIMEOUT_SECS);
    if tokio::time::timeout(timeout, poll_task).await.is_err() {
        warn!("Poller did not stop in time");
    }

    info!("Paddock shutting down");
    served
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "paddock",
            "--port",
            "8080",
            "--poll-hours",
            "6",
            "--cache-file",
            "/tmp/f1.json",
            "--force-update",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(args.mode, Mode::Web);
        assert!(args.force_update);
        assert_eq!(config.port, 8080);
        assert_eq!(config.poll_hours, 6);
        assert_eq!(config.cache_file, Some(PathBuf::from("/tmp/f1.json")));
        assert_eq!(config.bind, "0.0.0.0");
    }

    #[test]
    fn test_summary_mode_flag() {
        let args = Args::parse_from(["paddock", "--mode", "summary"]);
        assert_eq!(args.mode, Mode::Summary);
        assert!(!args.force_update);
        assert!(!args.clear_cache);
    }

    #[test]
    fn test_clear_cache_conflicts_with_force_update() {
        assert!(Args::try_parse_from(["paddock", "--clear-cache"]).is_ok());
        assert!(Args::try_parse_from(["paddock", "--clear-cache", "--force-update"]).is_err());
    }

    #[test]
    fn test_zero_poll_hours_rejected() {
        let args = Args::parse_from(["paddock", "--poll-hours", "0"]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert!(config.validate().is_err());
    }
}
