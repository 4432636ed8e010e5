//! Devices command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use helty_core::HeltyClient;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_devices_json, format_devices_text};
use crate::util::write_output;

pub async fn cmd_devices(
    client: &HeltyClient,
    format: OutputFormat,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let devices = client
        .find_devices()
        .await
        .context("Failed to list devices")?;

    let content = match format {
        OutputFormat::Json => format_devices_json(&devices, opts)?,
        OutputFormat::Text => format_devices_text(&devices, opts),
    };
    write_output(output, &content)
}
