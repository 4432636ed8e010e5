//! Helty Service - background sensor poller.
//!
//! Run with: `cargo run -p helty-service`

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use helty_core::Credentials;
use helty_service::{Config, Session, SessionRegistry};
use helty_types::{SensorField, SensorReading};

/// Helty Service - polls every unit of a Helty account.
#[derive(Parser, Debug)]
#[command(name = "helty-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll interval in seconds (overrides config).
    #[arg(short, long)]
    interval: Option<u64>,

    /// Account email.
    #[arg(long, env = "HELTY_EMAIL")]
    email: String,

    /// Account password.
    #[arg(long, env = "HELTY_PASSWORD", hide_env_values = true)]
    password: String,

    /// Enable verbose output.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.verbose, args.quiet))
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };

    // Override config with CLI args
    if let Some(interval) = args.interval {
        config.poller.interval_secs = interval;
    }
    config.validate()?;

    let registry = SessionRegistry::new();
    let credentials = Credentials::new(args.email, args.password);
    let session = registry.open("default", &credentials, &config).await?;

    for device in session.devices() {
        info!(
            "Polling {} [{}] every {}s",
            device.device().display_name(),
            device.device().serial_number,
            config.poller.interval_secs
        );
    }
    let loggers = spawn_loggers(&session);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    for logger in loggers {
        logger.abort();
    }
    registry.close_all().await;

    Ok(())
}

/// Log every state change of every device.
fn spawn_loggers(session: &Arc<Session>) -> Vec<tokio::task::JoinHandle<()>> {
    session
        .devices()
        .map(|device| {
            let serial = device.device().serial_number.clone();
            let mut rx = device.poller().subscribe();
            tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let state = rx.borrow_and_update().clone();
                    match state.current() {
                        Some(reading) => info!("{}: {}", serial, summarize(reading)),
                        None => warn!(
                            "{}: sensor data unavailable ({})",
                            serial,
                            state.last_error.as_deref().unwrap_or("no data")
                        ),
                    }
                }
            })
        })
        .collect()
}

fn summarize(reading: &SensorReading) -> String {
    reading
        .iter()
        .map(|(key, value)| format!("{}={}{}", key, value, SensorField::for_key(key).unit))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `-v` and `-q` win over `RUST_LOG`, which wins over the info default.
fn log_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("helty_service=debug,helty_core=debug")
    } else if quiet {
        EnvFilter::new("helty_service=warn,helty_core=warn")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("helty_service=info,helty_core=info"))
    }
}
