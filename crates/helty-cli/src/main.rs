//! Command-line interface for Helty VMC ventilation units.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `devices` | List the units registered to the account |
//! | `sensors` | Read current sensor values |
//! | `send` | Send a command by name or numeric id |
//! | `commands` | List the named commands |
//! | `completions` | Generate shell completions |
//!
//! # Environment Variables
//!
//! - `HELTY_EMAIL`, `HELTY_PASSWORD`: account credentials
//! - `HELTY_DEVICE`: default unit serial number (overridden by `--device`)
//! - `NO_COLOR`: Disable colored output when set

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use helty_core::ClientConfig;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod format;
mod util;

use cli::{Cli, Commands};
use commands::{cmd_commands, cmd_devices, cmd_send, cmd_sensors};
use format::FormatOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Handle completions command early (before tracing init)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "helty", &mut io::stdout());
        return Ok(());
    }

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let format = cli.format();
    let opts = FormatOptions::new(cli.no_color).with_compact(cli.compact);
    let output = cli.output.as_ref();

    // Offline commands first
    if let Commands::Commands = cli.command {
        return cmd_commands(format, output, &opts);
    }

    // Reject unknown command names before signing in
    let command_id = match &cli.command {
        Commands::Send { command, .. } => Some(util::parse_command(command)?),
        _ => None,
    };

    let credentials = util::require_credentials(cli.email.clone(), cli.password.clone())?;
    let mut config = ClientConfig::default();
    if let Some(url) = &cli.api_url {
        config = config.with_api_base_url(url.clone());
    }
    if let Some(url) = &cli.identity_url {
        config = config.with_identity_url(url.clone());
    }
    let client = util::connect(config, &credentials).await?;

    match &cli.command {
        Commands::Devices => cmd_devices(&client, format, output, &opts).await?,
        Commands::Sensors { device } => {
            cmd_sensors(&client, device.as_deref(), format, output, cli.quiet, &opts).await?
        }
        Commands::Send { device, .. } => {
            if let Some(command) = command_id {
                cmd_send(&client, command, device.as_deref(), format, output, &opts).await?
            }
        }
        Commands::Commands | Commands::Completions { .. } => {}
    }

    Ok(())
}
