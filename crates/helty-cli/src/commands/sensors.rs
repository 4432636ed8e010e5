//! Sensors command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use helty_core::HeltyClient;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_reading_json, format_reading_text};
use crate::util::{select_device, write_output};

pub async fn cmd_sensors(
    client: &HeltyClient,
    device: Option<&str>,
    format: OutputFormat,
    output: Option<&PathBuf>,
    quiet: bool,
    opts: &FormatOptions,
) -> Result<()> {
    let devices = client
        .find_devices()
        .await
        .context("Failed to list devices")?;
    let device = select_device(&devices, device)?;

    if !quiet && matches!(format, OutputFormat::Text) {
        eprintln!(
            "Reading sensors from {} (wait ~{}s)...",
            device.display_name(),
            client.config().status_read_delay_secs
        );
    }

    let reading = client
        .read_sensors(&device.board_serial_number, &device.serial_number)
        .await
        .context("Failed to read sensors")?;

    let content = match format {
        OutputFormat::Json => format_reading_json(device, &reading, opts)?,
        OutputFormat::Text => format_reading_text(device, &reading, opts),
    };
    write_output(output, &content)
}
