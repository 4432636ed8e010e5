//! Send command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use helty_core::HeltyClient;
use helty_types::CommandId;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, command_label, format_reply_json, format_reply_text};
use crate::util::{select_device, write_output};

pub async fn cmd_send(
    client: &HeltyClient,
    command: CommandId,
    device: Option<&str>,
    format: OutputFormat,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let devices = client
        .find_devices()
        .await
        .context("Failed to list devices")?;
    let device = select_device(&devices, device)?;

    let reply = client
        .send_command(&device.board_serial_number, command)
        .await
        .with_context(|| format!("Failed to send {}", command_label(command)))?;

    let content = match format {
        OutputFormat::Json => format_reply_json(device, command, &reply, opts)?,
        OutputFormat::Text => format_reply_text(device, command, &reply),
    };
    write_output(output, &content)
}
