//! Utility functions for CLI operations.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use helty_core::{ClientConfig, Credentials, HeltyClient};
use helty_types::{CommandId, Device};
use tracing::debug;

/// Build credentials from the global flags, with a helpful error message.
pub fn require_credentials(email: Option<String>, password: Option<String>) -> Result<Credentials> {
    match (email, password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            Ok(Credentials::new(email, password))
        }
        _ => bail!(
            "No credentials given. Use --email and --password or set the \
             HELTY_EMAIL and HELTY_PASSWORD environment variables."
        ),
    }
}

/// Create a client and sign in.
pub async fn connect(config: ClientConfig, credentials: &Credentials) -> Result<HeltyClient> {
    let client = HeltyClient::new(config).context("Invalid client configuration")?;
    client
        .authenticate(credentials.email(), credentials.password())
        .await
        .with_context(|| format!("Failed to sign in as {}", credentials.email()))?;
    debug!("Signed in as {}", credentials.email());
    Ok(client)
}

/// Pick the device to talk to.
///
/// With a selector, match the product or board serial number
/// (case-insensitive); without one, take the first device.
pub fn select_device<'a>(devices: &'a [Device], selector: Option<&str>) -> Result<&'a Device> {
    if devices.is_empty() {
        bail!("No Helty units found for this account.");
    }

    let Some(selector) = selector else {
        return Ok(&devices[0]);
    };

    devices
        .iter()
        .find(|d| {
            d.serial_number.eq_ignore_ascii_case(selector)
                || d.board_serial_number.eq_ignore_ascii_case(selector)
        })
        .ok_or_else(|| {
            let known: Vec<&str> = devices.iter().map(|d| d.serial_number.as_str()).collect();
            anyhow!(
                "No unit with serial number '{}'. Known units: {}",
                selector,
                known.join(", ")
            )
        })
}

/// Parse a catalogue name or raw numeric command id.
pub fn parse_command(input: &str) -> Result<CommandId> {
    input
        .parse::<CommandId>()
        .map_err(|e| anyhow!("{}. Run 'helty commands' to list the named commands.", e))
}

/// Write output to file or stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}
