//! gamewardend - The gamewarden background service
//!
//! This is the main entry point for the gamewardend service.
//! It wires together all the components:
//! - Configuration loading and CLI overrides
//! - The JSON usage store
//! - The system host adapter and desktop notifications
//! - The monitor worker
//! - Signal handling and service registration

mod service;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use gamewarden_config::{Settings, load_config_or_default};
use gamewarden_core::{Monitor, MonitorStatus, MonitorWorker, Notifier, SystemClock};
use gamewarden_host::{DesktopSink, SystemHost};
use gamewarden_store::{JsonUsageStore, UsageStore};
use gamewarden_util::{
    day_key, default_config_path, default_data_dir, format_hms, parse_duration, usage_file_in,
};
use service::ServiceAction;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// gamewardend - Daily game-time limits for launcher-started games
#[derive(Parser, Debug)]
#[command(name = "gamewardend")]
#[command(about = "Daily game-time limits for launcher-started games", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Configuration file path (default: ~/.config/gamewarden/config.toml)
    #[arg(short, long, global = true, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set GAMEWARDEN_DATA_DIR env var)
    #[arg(short, long, global = true, env = "GAMEWARDEN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Usage file override (default: <data dir>/usage.json)
    #[arg(long, global = true)]
    usage_file: Option<PathBuf>,

    /// Daily limit, e.g. 2h, 90m, 45s, 10min
    #[arg(long, global = true, value_parser = parse_limit)]
    limit: Option<Duration>,

    /// Delete the usage file before starting
    #[arg(long, global = true)]
    reset: bool,

    /// Seconds between checks
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval: Option<u64>,

    /// Log level
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the monitor in the foreground (default)
    Run,

    /// Print today's usage from the usage file
    Status,

    /// Manage the background service
    Service {
        #[command(subcommand)]
        action: ServiceAction,
    },
}

fn parse_limit(text: &str) -> Result<Duration, String> {
    let limit = parse_duration(text).map_err(|e| e.to_string())?;
    if limit.is_zero() {
        return Err("Daily limit must be greater than zero".into());
    }
    Ok(limit)
}

/// Config file (or defaults), with CLI flags on top
fn layered_settings(args: &Args) -> Result<Settings> {
    let mut settings = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    if let Some(limit) = args.limit {
        settings.daily_limit = limit;
    }
    if let Some(secs) = args.poll_interval {
        settings.daemon.poll_interval = Duration::from_secs(secs);
    }
    if let Some(dir) = &args.data_dir {
        settings.daemon.data_dir = Some(dir.clone());
    }
    if let Some(file) = &args.usage_file {
        settings.daemon.usage_file = Some(file.clone());
    }

    Ok(settings)
}

fn usage_path(settings: &Settings) -> PathBuf {
    settings.daemon.usage_file.clone().unwrap_or_else(|| {
        usage_file_in(
            settings
                .daemon
                .data_dir
                .clone()
                .unwrap_or_else(default_data_dir),
        )
    })
}

/// Shutdown signals: SIGTERM, SIGINT and SIGHUP
#[cfg(unix)]
struct ShutdownSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
    sighup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigterm: signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?,
            sigint: signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?,
            sighup: signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sighup.recv() => "SIGHUP",
        }
    }
}

/// Shutdown signal: Ctrl-C
#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn new() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        "Ctrl-C"
    }
}

fn log_status_change(previous: &MonitorStatus, current: &MonitorStatus) {
    if current.exhausted && !previous.exhausted {
        warn!(
            day = %current.day,
            used = %format_hms(current.used),
            "Daily limit exhausted"
        );
    }
    if current.active_games != previous.active_games {
        info!(
            active_games = current.active_games,
            remaining = %format_hms(current.remaining),
            "Active games changed"
        );
    }
}

async fn run(settings: Settings, reset: bool) -> Result<()> {
    let usage_path = usage_path(&settings);
    let store = JsonUsageStore::new(&usage_path);

    if gamewarden_util::is_mock_time_active() {
        warn!(
            now = %gamewarden_util::now(),
            "Mock time active, day keys follow GAMEWARDEN_MOCK_TIME"
        );
    }

    if reset {
        store
            .reset()
            .with_context(|| format!("Failed to reset usage file {:?}", usage_path))?;
        info!(usage_file = %usage_path.display(), "Usage file reset");
    }

    info!(
        usage_file = %usage_path.display(),
        limit = %format_hms(settings.daily_limit),
        poll_interval_secs = settings.daemon.poll_interval.as_secs(),
        launcher = %settings.launcher.executable,
        helpers = settings.launcher.helpers.len(),
        "Configuration loaded"
    );

    let host = Arc::new(SystemHost::new());

    let notifier = if settings.notifications.enabled {
        Notifier::new(
            Box::new(DesktopSink::new("gamewarden")),
            settings.notifications.title.clone(),
        )
    } else {
        info!("Notifications disabled by configuration");
        Notifier::disabled()
    };

    let monitor = Monitor::new(
        settings.daily_limit,
        &settings.launcher,
        host,
        Box::new(store),
        notifier,
        Box::new(SystemClock),
    );

    let mut signals = ShutdownSignals::new()?;
    let worker = MonitorWorker::spawn(monitor, settings.daemon.poll_interval)
        .context("Failed to start monitor worker")?;
    let mut status = worker.subscribe();
    let mut last = status.borrow_and_update().clone();

    info!("Service running");

    loop {
        tokio::select! {
            name = signals.recv() => {
                info!(signal = name, "Received signal, shutting down gracefully");
                break;
            }

            changed = status.changed() => {
                if changed.is_err() {
                    warn!("Monitor worker exited unexpectedly");
                    break;
                }
                let current = status.borrow_and_update().clone();
                log_status_change(&last, &current);
                last = current;
            }
        }
    }

    info!("Shutting down gamewardend");

    // Joining waits for the tick in progress to finish
    let monitor = tokio::task::spawn_blocking(move || worker.stop())
        .await
        .context("Failed to join monitor worker")?
        .map_err(|_| anyhow!("Monitor worker panicked"))?;

    let final_status = monitor.status();
    info!(
        day = %final_status.day,
        used = %format_hms(final_status.used),
        "Shutdown complete"
    );
    Ok(())
}

fn print_status(settings: &Settings) {
    let path = usage_path(settings);
    let record = JsonUsageStore::new(&path).peek();
    let today = day_key(&gamewarden_util::now());
    let used = record.used(&today);

    println!("Day:        {}", today);
    println!("Used:       {}", format_hms(used));
    println!("Limit:      {}", format_hms(settings.daily_limit));
    println!(
        "Remaining:  {}",
        format_hms(settings.daily_limit.saturating_sub(used))
    );
    println!("Usage file: {}", path.display());
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let settings = layered_settings(&args)?;

    match &args.command {
        None | Some(Command::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "gamewardend starting");
            run(settings, args.reset).await
        }
        Some(Command::Status) => {
            print_status(&settings);
            Ok(())
        }
        Some(Command::Service { action }) => {
            service::manage(*action, &settings, &args.config)
        }
    }
}
