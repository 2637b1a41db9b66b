//! Frame Watcher - Apple TV → Samsung Frame Art Mode watcher
//!
//! Polls the Apple TV power state through `atvremote` and puts the Frame back
//! into Art Mode once the Apple TV turns off.

use anyhow::Result;
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use frame_watcher::config::{AppConfig, Overrides};
use frame_watcher::display::{DisplayClient, DisplayControl, SamsungFrame};
use frame_watcher::paths::AppPaths;
use frame_watcher::player::{AtvRemote, PlayerPowerState, PlayerStateProbe};
use frame_watcher::{Watcher, WatcherTimings};

/// Frame Watcher - keep a Samsung Frame in Art Mode while the Apple TV is off
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "FRAME_WATCHER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also write logs to this file
    #[arg(long, env = "FRAME_WATCHER_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Frame TV address (overrides display.host)
    #[arg(long, env = "FRAME_HOST")]
    display_host: Option<String>,

    /// Frame pairing token file (overrides display.token_file)
    #[arg(long, env = "FRAME_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Apple TV identifier (overrides player.id)
    #[arg(long, env = "ATV_ID")]
    player_id: Option<String>,

    /// Apple TV address (overrides player.address)
    #[arg(long, env = "ATV_ADDRESS")]
    player_address: Option<String>,

    /// Print the current Apple TV / Frame state once and exit
    #[arg(long)]
    status: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging; the guard flushes the log file on exit
    let _log_guard = init_logging(&args.log_level, args.log_file.as_deref())?;

    let paths = AppPaths::detect();
    let config_path = args.config.clone().unwrap_or_else(|| paths.config.clone());
    info!("Configuration file: {}", config_path.display());

    let mut config = AppConfig::load(&config_path).await?;
    config.apply_overrides(Overrides {
        display_host: args.display_host,
        token_file: args.token_file,
        player_id: args.player_id,
        player_address: args.player_address,
    })?;
    if config.display.token_file.is_none() {
        config.display.token_file = Some(paths.token_file.clone());
    }

    let probe = PlayerStateProbe::from_config(AtvRemote::from_config(&config.player), &config.player);
    let display = DisplayClient::new(SamsungFrame::from_config(&config.display))
        .with_retry_delay(Duration::from_millis(config.watcher.art_mode_retry_delay_ms));

    if args.status {
        print_status(&probe, &display, &config).await;
        return Ok(());
    }

    info!(
        "Watching Apple TV {} → Frame {}:{}",
        config.player.id, config.display.host, config.display.port
    );

    let watcher = Watcher::new(probe, display, WatcherTimings::from(&config.watcher));
    watcher.run(shutdown_signal()).await;

    Ok(())
}

/// `2024-05-01 21:04:33`-style local timestamps, easy to scan in the journal
struct LocalTimestamp;

impl FormatTime for LocalTimestamp {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

fn init_logging(level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(dir)?;

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_timer(LocalTimestamp);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_timer(LocalTimestamp),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        // Without a handler the watcher simply runs until killed
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn print_status(
    probe: &PlayerStateProbe<AtvRemote>,
    display: &DisplayClient<SamsungFrame>,
    config: &AppConfig,
) {
    println!("\n{}", "=== Frame Watcher Status ===".bold().cyan());

    let player = probe.resolve().await;
    let player_str = match player {
        PlayerPowerState::On => "on".green(),
        PlayerPowerState::Off => "off".yellow(),
        PlayerPowerState::Unknown => "unknown (treated as off)".red(),
    };
    println!("  Apple TV {}: {}", config.player.id.bright_white(), player_str);

    let power = display.power_state().await;
    println!(
        "  Frame {}: power {}",
        config.display.host.bright_white(),
        power.as_str().green()
    );

    let art = display.art_mode_is_on(config.watcher.art_mode_retries).await;
    let art_str = if art { "on".green() } else { "off".yellow() };
    println!("  Art mode: {}", art_str);
    println!();
}
