//! cadence-send - Background daemon for syncing scheduled posts
//!
//! Sweeps posts waiting to be pushed to the publishing service and
//! periodically refreshes analytics for recently published posts.

use clap::Parser;
use libcadence::logging::LoggingConfig;
use libcadence::{CadenceError, CadenceService, Config};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

const ANALYTICS_REFRESH: Duration = Duration::from_secs(3600);

#[derive(Parser, Debug)]
#[command(name = "cadence-send")]
#[command(version)]
#[command(about = "Background daemon for syncing scheduled posts")]
#[command(long_about = "\
cadence-send - Background daemon for syncing scheduled posts

DESCRIPTION:
    cadence-send is a long-running daemon that watches the Cadence queue
    and pushes posts waiting to be synced to the publishing service.

    Each poll runs one sweep over posts in PENDING_SYNC. Posts that sync
    become SCHEDULED; posts the service rejects become FAILED and stay
    there until requeued. Once an hour it also refreshes analytics for
    posts published within the configured window.

USAGE:
    # Run in foreground (logs to stderr)
    cadence-send

    # Run with custom poll interval
    cadence-send --poll-interval 30

    # Enable verbose logging
    cadence-send --verbose

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes the current sweep)

CONFIGURATION:
    Configuration file: ~/.config/cadence/config.toml (or CADENCE_CONFIG)
    Database location: ~/.local/share/cadence/cadence.db (or CADENCE_DB_PATH)

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
    /// Poll interval in seconds (overrides config)
    #[arg(long, value_name = "SECONDS")]
    #[arg(help = "How often to sweep pending posts (default: from config)")]
    poll_interval: Option<u64>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    #[arg(help = "Enable verbose logging (useful for debugging)")]
    verbose: bool,

    /// Run once and exit (for testing)
    #[arg(long, hide = true)]
    #[arg(help = "Sweep pending posts once and exit (for testing)")]
    once: bool,
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
    let config = Config::load()?;
    LoggingConfig::from_section(&config.logging, cli.verbose).init();

    let poll_interval = cli.poll_interval.unwrap_or(config.sync.poll_interval);
    if poll_interval == 0 {
        return Err(CadenceError::Validation("poll interval must be greater than zero".into()).into());
    }
    let analytics_days = config.sync.analytics_window_days;

    let service = CadenceService::from_config(config).await?;

    info!("cadence-send daemon starting");

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    info!("Poll interval: {}s", poll_interval);

    if cli.once {
        sweep_pending(&service).await?;
        refresh_analytics(&service, analytics_days).await?;
        info!("cadence-send: processed pending posts once, exiting");
    } else {
        run_daemon_loop(&service, poll_interval, analytics_days, shutdown).await;
    }

    info!("cadence-send daemon stopped");
    Ok(())
}

/// Set up signal handlers for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
    use anyhow::Context;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Signal setup failed")?;

    std::thread::spawn(move || {
        if signals.forever().next().is_some() {
            info!("Received shutdown signal, stopping gracefully...");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(_shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
    Ok(())
}

/// Main daemon loop
async fn run_daemon_loop(
    service: &CadenceService,
    poll_interval: u64,
    analytics_days: u32,
    shutdown: Arc<AtomicBool>,
) {
    let mut last_analytics: Option<Instant> = None;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested, stopping daemon loop");
            break;
        }

        if let Err(e) = sweep_pending(service).await {
            error!("Error sweeping pending posts: {}", e);
        }

        if last_analytics.map_or(true, |at| at.elapsed() >= ANALYTICS_REFRESH) {
            if let Err(e) = refresh_analytics(service, analytics_days).await {
                error!("Error refreshing analytics: {}", e);
            }
            last_analytics = Some(Instant::now());
        }

        // Sleep until next poll (check shutdown every second)
        for _ in 0..poll_interval {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            sleep(Duration::from_secs(1)).await;
        }
    }
}

async fn sweep_pending(service: &CadenceService) -> libcadence::Result<()> {
    let report = service.sync().sweep().await?;

    if report.synced == 0 && report.failed == 0 {
        debug!("No posts pending sync");
    } else {
        info!(
            "Sweep complete: {} synced, {} failed",
            report.synced, report.failed
        );
    }
    Ok(())
}

async fn refresh_analytics(service: &CadenceService, days: u32) -> libcadence::Result<()> {
    let report = service.analytics().sync_recent_published(days).await?;

    if report.synced > 0 || report.failed > 0 {
        info!(
            "Analytics refreshed: {} synced, {} failed",
            report.synced, report.failed
        );
    }
    Ok(())
}
