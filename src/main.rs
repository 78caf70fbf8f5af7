//! Gamma VJ - controller input console
//!
//! Opens a DJ controller's MIDI input, shows the decoded signal log and tracks
//! the jog-wheel dials.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gamma_vj::cli::{self, DeviceTarget};
use gamma_vj::config::AppConfig;
use gamma_vj::monitor;
use gamma_vj::{DeviceSession, RotationAggregator};

/// Gamma VJ - MIDI controller setup and monitor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults are used if it does not exist)
    #[arg(short, long, default_value = "gamma.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, env = "GAMMA_LOG_DIR")]
    log_dir: Option<String>,

    /// List available MIDI input ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Device to open on startup: port index or exact port name
    #[arg(short, long)]
    device: Option<String>,

    /// Stream the signal log instead of starting the command shell
    #[arg(long)]
    monitor: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let _log_guard = init_logging(&args.log_level, args.log_dir.as_deref())?;

    info!("Starting Gamma VJ...");
    info!("Configuration file: {}", args.config);

    let config = AppConfig::load_or_default(&args.config).await?;

    let mut session = DeviceSession::midir(&config.midi.client_name, config.midi.log_limit);
    if let Err(e) = session.initialize() {
        warn!("Continuing without MIDI input: {}", e);
    }

    if args.list_ports {
        monitor::list_ports_formatted(&session);
        return Ok(());
    }

    let dials = Arc::new(RotationAggregator::new());
    session.set_shared_jog_callback(dials.jog_callback());

    if let Some(device) = args.device.or_else(|| config.midi.device.clone()) {
        match DeviceTarget::parse(&device).connect(&mut session) {
            Ok(()) => info!(
                "Connected to {}",
                session.connected_device_name().unwrap_or_default()
            ),
            Err(e) => warn!("Could not open {}: {}", device, e),
        }
    }

    if args.monitor {
        monitor::run_monitor(session, dials, &config.monitor).await?;
    } else {
        cli::run_repl(session, dials, &config.monitor)?;
    }

    info!("Gamma VJ shutdown complete");
    Ok(())
}

fn init_logging(level: &str, log_dir: Option<&str>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(Path::new(dir))
                .with_context(|| format!("Failed to create log directory: {}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, "gamma-vj.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
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
                .with_thread_names(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}
