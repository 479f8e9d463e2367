//! cadence-server - HTTP API for scheduling and calendar management
//!
//! Serves the REST surface and runs the pending-sync sweeper and the
//! analytics refresh in the background until asked to stop.

use anyhow::Context;
use cadence_server::{app, AppState};
use clap::Parser;
use libcadence::logging::LoggingConfig;
use libcadence::{CadenceError, CadenceService, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

const ANALYTICS_REFRESH: Duration = Duration::from_secs(3600);

#[derive(Parser, Debug)]
#[command(name = "cadence-server")]
#[command(version)]
#[command(about = "HTTP API for scheduled social posts")]
#[command(long_about = "\
cadence-server - HTTP API for scheduled social posts

DESCRIPTION:
    cadence-server exposes the Cadence scheduling engine over HTTP. Clients
    create posts for connected accounts, move them around the calendar,
    cancel or publish them immediately and read back engagement numbers.

    While running it also sweeps posts waiting to be synced with the
    publishing service and refreshes analytics for recent posts.

USAGE:
    # Serve on the address from the config file
    cadence-server

    # Override the bind address
    cadence-server --bind 0.0.0.0:9000

SIGNALS:
    SIGTERM, SIGINT, SIGQUIT - Graceful shutdown (drains open requests)

CONFIGURATION:
    Configuration file: ~/.config/cadence/config.toml (or CADENCE_CONFIG)
    Database location: ~/.local/share/cadence/cadence.db (or CADENCE_DB_PATH)

    [server]
    bind = \"127.0.0.1:8080\"

    [sync]
    poll_interval = 60          # seconds between sweeps
    analytics_window_days = 7   # how far back analytics are refreshed

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime error
    2 - Configuration or database error
    3 - Invalid input
")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, env = "CADENCE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config)
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<CadenceError>()
            .map(CadenceError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    LoggingConfig::from_section(&config.logging, cli.verbose).init();

    let bind = cli.bind.clone().unwrap_or_else(|| config.server.bind.clone());
    let poll_interval = config.sync.poll_interval;
    let analytics_days = config.sync.analytics_window_days;

    let service = CadenceService::from_config(config).await?;
    info!("cadence-server starting");
    info!("Poll interval: {}s", poll_interval);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let background = tokio::spawn(run_background(
        service.clone(),
        Duration::from_secs(poll_interval),
        analytics_days,
        shutdown_rx,
    ));

    let state = Arc::new(AppState::new(service));
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    info!(address = %bind, "listening");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = background.await {
        error!("background task panicked: {}", e);
    }

    info!("cadence-server stopped");
    Ok(())
}

/// Periodic sweep of pending posts plus the slower analytics refresh
async fn run_background(
    service: CadenceService,
    poll_interval: Duration,
    analytics_days: u32,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut sweep_tick = interval(poll_interval);
    sweep_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut analytics_tick = interval(ANALYTICS_REFRESH);
    analytics_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = sweep_tick.tick() => {
                if let Err(e) = service.sync().sweep().await {
                    error!("Error sweeping pending posts: {}", e);
                }
            }
            _ = analytics_tick.tick() => {
                if let Err(e) = service.analytics().sync_recent_published(analytics_days).await {
                    error!("Error refreshing analytics: {}", e);
                }
            }
            _ = shutdown.changed() => {
                info!("Shutdown requested, stopping background tasks");
                break;
            }
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use futures::StreamExt;
    use signal_hook::consts::signal::{SIGINT, SIGQUIT, SIGTERM};
    use signal_hook_tokio::Signals;

    let mut signals = match Signals::new([SIGTERM, SIGINT, SIGQUIT]) {
        Ok(signals) => signals,
        Err(e) => {
            error!("Signal setup failed: {}", e);
            return std::future::pending().await;
        }
    };
    let handle = signals.handle();

    if let Some(sig) = signals.next().await {
        info!(signal = sig, "Received shutdown signal, stopping gracefully...");
    }
    handle.close();
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received shutdown signal, stopping gracefully...");
    }
}
