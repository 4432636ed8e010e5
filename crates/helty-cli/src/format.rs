//! Output formatting utilities for text and JSON output.

use anyhow::Result;
use helty_types::{
    CATALOGUE, CommandCategory, CommandId, Device, SensorField, SensorKey, SensorReading, VmcStatus,
};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self {
            no_color,
            compact: false,
        }
    }

    /// Create with compact JSON option.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }

    fn heading(&self, text: &str) -> String {
        if self.no_color {
            text.to_string()
        } else {
            format!("{}", text.bold())
        }
    }
}

/// Format an operating mode with color
#[must_use]
pub fn format_status(status: Option<VmcStatus>, no_color: bool) -> String {
    let label = status
        .map(|s| s.to_string().to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string());

    if no_color {
        return format!("[{}]", label);
    }
    match status {
        Some(VmcStatus::Off) => format!("[{}]", label.dimmed()),
        Some(VmcStatus::Normal) => format!("[{}]", label.green()),
        Some(VmcStatus::Hyperventilation) => format!("[{}]", label.yellow()),
        Some(VmcStatus::Night) => format!("[{}]", label.blue()),
        Some(VmcStatus::Cooling) => format!("[{}]", label.cyan()),
        None => format!("[{}]", label.dimmed()),
    }
}

// ============================================================================
// Device formatting
// ============================================================================

#[must_use]
pub fn format_devices_text(devices: &[Device], opts: &FormatOptions) -> String {
    if devices.is_empty() {
        return "No Helty units found for this account.\n".to_string();
    }

    #[derive(Tabled)]
    struct DeviceRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Serial")]
        serial: String,
        #[tabled(rename = "Board")]
        board: String,
        #[tabled(rename = "Owner")]
        owner: String,
    }

    let rows: Vec<DeviceRow> = devices
        .iter()
        .map(|d| DeviceRow {
            name: if opts.no_color {
                d.display_name()
            } else {
                format!("{}", d.display_name().cyan())
            },
            serial: d.serial_number.clone(),
            board: d.board_serial_number.clone(),
            owner: if d.owner_name.is_empty() {
                d.owner_email.clone()
            } else {
                format!("{} <{}>", d.owner_name, d.owner_email)
            },
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!("Found {} Helty unit(s)\n\n{}\n", devices.len(), table)
}

pub fn format_devices_json(devices: &[Device], opts: &FormatOptions) -> Result<String> {
    #[derive(Serialize)]
    struct DeviceList<'a> {
        count: usize,
        devices: &'a [Device],
    }

    opts.as_json(&DeviceList {
        count: devices.len(),
        devices,
    })
}

// ============================================================================
// Reading formatting
// ============================================================================

#[must_use]
pub fn format_reading_text(
    device: &Device,
    reading: &SensorReading,
    opts: &FormatOptions,
) -> String {
    let mut output = format!("{}\n", opts.heading(&device.display_name()));

    if reading.is_empty() {
        output.push_str("  No sensor data reported.\n");
        return output;
    }

    for key in SensorKey::ALL {
        let Some(value) = reading.get(key) else {
            continue;
        };
        let display = match key {
            SensorKey::VmcStatus => format_status(reading.status(), opts.no_color),
            _ => format!("{} {}", value, SensorField::for_key(key).unit),
        };
        let label = format!("{}:", key.label());
        output.push_str(&format!("  {:<20} {}\n", label, display));
    }
    output
}

pub fn format_reading_json(
    device: &Device,
    reading: &SensorReading,
    opts: &FormatOptions,
) -> Result<String> {
    #[derive(Serialize)]
    struct ReadingJson<'a> {
        serial_number: &'a str,
        name: String,
        #[serde(flatten)]
        reading: &'a SensorReading,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<VmcStatus>,
    }

    opts.as_json(&ReadingJson {
        serial_number: &device.serial_number,
        name: device.display_name(),
        reading,
        status: reading.status(),
    })
}

// ============================================================================
// Command formatting
// ============================================================================

#[must_use]
pub fn format_catalogue_text(opts: &FormatOptions) -> String {
    let mut output = String::new();
    for category in CommandCategory::ALL {
        output.push_str(&format!("{}\n", opts.heading(&category.to_string())));
        for command in category.commands() {
            output.push_str(&format!(
                "  {:<14} {:>3}  {}\n",
                command.name, command.id.0, command.description
            ));
        }
        output.push('\n');
    }
    output
}

pub fn format_catalogue_json(opts: &FormatOptions) -> Result<String> {
    #[derive(Serialize)]
    struct CommandJson {
        name: &'static str,
        id: i32,
        label: &'static str,
        description: &'static str,
        category: String,
    }

    let commands: Vec<CommandJson> = CATALOGUE
        .iter()
        .map(|c| CommandJson {
            name: c.name,
            id: c.id.0,
            label: c.label,
            description: c.description,
            category: c.category.to_string(),
        })
        .collect();
    opts.as_json(&commands)
}

/// Label for a command id, falling back to the raw number.
#[must_use]
pub fn command_label(command: CommandId) -> String {
    match command.named() {
        Some(named) => format!("{} ({})", named.name, command),
        None => format!("#{}", command),
    }
}

#[must_use]
pub fn format_reply_text(device: &Device, command: CommandId, reply: &Value) -> String {
    let mut output = format!(
        "Sent {} to {}\n",
        command_label(command),
        device.display_name()
    );
    let empty = reply.as_object().is_some_and(|o| o.is_empty());
    if !empty {
        output.push_str(&format!("Response: {}\n", reply));
    }
    output
}

pub fn format_reply_json(
    device: &Device,
    command: CommandId,
    reply: &Value,
    opts: &FormatOptions,
) -> Result<String> {
    #[derive(Serialize)]
    struct ReplyJson<'a> {
        serial_number: &'a str,
        command_id: i32,
        #[serde(skip_serializing_if = "Option::is_none")]
        command: Option<&'static str>,
        response: &'a Value,
    }

    opts.as_json(&ReplyJson {
        serial_number: &device.serial_number,
        command_id: command.0,
        command: command.named().map(|c| c.name),
        response: reply,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device() -> Device {
        Device {
            product_id: "p1".to_string(),
            serial_number: "SN1".to_string(),
            board_serial_number: "B1".to_string(),
            model: "Flow Elite".to_string(),
            product_line: String::new(),
            board_id: None,
            installation_label: "Home - Bedroom".to_string(),
            owner_name: "Ada Lovelace".to_string(),
            owner_email: "ada@example.com".to_string(),
        }
    }

    fn plain() -> FormatOptions {
        FormatOptions::new(true)
    }

    #[test]
    fn test_format_status_no_color() {
        assert_eq!(format_status(Some(VmcStatus::Normal), true), "[NORMAL]");
        assert_eq!(format_status(Some(VmcStatus::Off), true), "[OFF]");
        assert_eq!(format_status(None, true), "[UNKNOWN]");
    }

    #[test]
    fn test_format_status_with_color_contains_label() {
        let result = format_status(Some(VmcStatus::Hyperventilation), false);
        assert!(result.contains("HYPERVENTILATION"));
    }

    #[test]
    fn test_devices_text_lists_every_unit() {
        let text = format_devices_text(&[device()], &plain());
        assert!(text.starts_with("Found 1 Helty unit(s)"));
        assert!(text.contains("Helty Flow Elite (Home - Bedroom)"));
        assert!(text.contains("SN1"));
        assert!(text.contains("Ada Lovelace <ada@example.com>"));
    }

    #[test]
    fn test_devices_text_empty() {
        assert_eq!(
            format_devices_text(&[], &plain()),
            "No Helty units found for this account.\n"
        );
    }

    #[test]
    fn test_devices_json() {
        let json = format_devices_json(&[device()], &plain()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["devices"][0]["serial_number"], "SN1");
    }

    #[test]
    fn test_reading_text_skips_missing_metrics() {
        let reading = SensorReading {
            temp_indoor: Some(20.8),
            co2: Some(734.0),
            vmc_status: Some(1),
            ..Default::default()
        };
        let text = format_reading_text(&device(), &reading, &plain());

        assert!(text.contains("20.8 °C"));
        assert!(text.contains("734 ppm"));
        assert!(text.contains("[NORMAL]"));
        assert!(!text.contains("Humidity"));
    }

    #[test]
    fn test_reading_text_empty() {
        let text = format_reading_text(&device(), &SensorReading::default(), &plain());
        assert!(text.contains("No sensor data reported."));
    }

    #[test]
    fn test_reading_json_is_flat() {
        let reading = SensorReading {
            humidity: Some(45.5),
            vmc_status: Some(3),
            ..Default::default()
        };
        let json = format_reading_json(&device(), &reading, &plain().with_compact(true)).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["serial_number"], "SN1");
        assert_eq!(value["humidity"], 45.5);
        assert_eq!(value["vmc_status"], 3);
        assert_eq!(value["status"], "Night");
        assert!(value.get("co2").is_none());
        assert!(!json.trim_end().contains('\n'));
    }

    #[test]
    fn test_catalogue_text_groups_by_category() {
        let text = format_catalogue_text(&plain());
        let speed = text.find("Speed\n").unwrap();
        let mode = text.find("Mode\n").unwrap();
        let night = text.find("night").unwrap();
        assert!(speed < mode && mode < night);
        assert!(text.contains("Night (silent) mode"));
    }

    #[test]
    fn test_catalogue_json_has_every_entry() {
        let json = format_catalogue_json(&plain()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().unwrap().len(), CATALOGUE.len());
    }

    #[test]
    fn test_command_label() {
        assert_eq!(command_label(CommandId::NIGHT), "night (22)");
        assert_eq!(command_label(CommandId(123)), "#123");
    }

    #[test]
    fn test_reply_text_hides_empty_response() {
        let text = format_reply_text(&device(), CommandId::HYPER, &json!({}));
        assert_eq!(text, "Sent hyper (23) to Helty Flow Elite (Home - Bedroom)\n");

        let reply = json!({ "ip": "10.0.0.2" });
        let text = format_reply_text(&device(), CommandId::GET_INFO, &reply);
        assert!(text.contains("Response: {\"ip\":\"10.0.0.2\"}"));
    }
}
