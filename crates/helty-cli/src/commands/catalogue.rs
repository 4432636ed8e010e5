//! Commands listing.

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_catalogue_json, format_catalogue_text};
use crate::util::write_output;

pub fn cmd_commands(
    format: OutputFormat,
    output: Option<&PathBuf>,
    opts: &FormatOptions,
) -> Result<()> {
    let content = match format {
        OutputFormat::Json => format_catalogue_json(opts)?,
        OutputFormat::Text => format_catalogue_text(opts),
    };
    write_output(output, &content)
}
