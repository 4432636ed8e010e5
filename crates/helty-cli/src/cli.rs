//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "helty")]
#[command(author, version, about = "CLI for Helty VMC ventilation units", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output compact JSON (no pretty-printing)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Helty account email
    #[arg(long, global = true, env = "HELTY_EMAIL")]
    pub email: Option<String>,

    /// Helty account password
    #[arg(long, global = true, env = "HELTY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Cloud API base URL
    #[arg(long, global = true, env = "HELTY_API_URL", hide = true)]
    pub api_url: Option<String>,

    /// Identity provider endpoint
    #[arg(long, global = true, env = "HELTY_IDENTITY_URL", hide = true)]
    pub identity_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the units registered to the account
    Devices,

    /// Read current sensor values (takes a few seconds)
    Sensors {
        /// Serial number of the unit (defaults to the first one found)
        #[arg(short, long, env = "HELTY_DEVICE")]
        device: Option<String>,
    },

    /// Send a command by catalogue name or numeric id
    Send {
        /// Command name (e.g. "night", "speed2") or raw id
        command: String,

        /// Serial number of the unit (defaults to the first one found)
        #[arg(short, long, env = "HELTY_DEVICE")]
        device: Option<String>,
    },

    /// List the named commands
    Commands,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
