//! Core types for Helty VMC devices and their telemetry.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A ventilation unit discovered through the cloud product search.
///
/// A device is identified by its [`serial_number`](Self::serial_number) and
/// addressed by its [`board_serial_number`](Self::board_serial_number) when
/// commands are sent: the board identifies the physical controller, while the
/// serial number identifies the logical product record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Device {
    /// Cloud product record id.
    pub product_id: String,
    /// Product serial number (used for the status log lookup).
    pub serial_number: String,
    /// Serial number of the controller board (used as the command target).
    pub board_serial_number: String,
    /// Product model, `"Unknown"` if the cloud did not report one.
    pub model: String,
    /// Product line, empty if not reported.
    pub product_line: String,
    /// Cloud board record id.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub board_id: Option<String>,
    /// `"<name> - <place>"` of the current installation, empty if none.
    pub installation_label: String,
    /// Owner's first and last name.
    pub owner_name: String,
    /// Owner's email address.
    pub owner_email: String,
}

impl Device {
    /// Display name used in listings and logs.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.installation_label.is_empty() {
            format!("Helty {}", self.model)
        } else {
            format!("Helty {} ({})", self.model, self.installation_label)
        }
    }
}

/// Metric keys reported by a status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SensorKey {
    TempIndoor,
    TempOutdoor,
    Humidity,
    Co2,
    Voc,
    VmcStatus,
}

impl SensorKey {
    /// All keys, in display order.
    pub const ALL: [SensorKey; 6] = [
        SensorKey::TempIndoor,
        SensorKey::TempOutdoor,
        SensorKey::Humidity,
        SensorKey::Co2,
        SensorKey::Voc,
        SensorKey::VmcStatus,
    ];

    /// Stable snake_case key, as used in JSON output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKey::TempIndoor => "temp_indoor",
            SensorKey::TempOutdoor => "temp_outdoor",
            SensorKey::Humidity => "humidity",
            SensorKey::Co2 => "co2",
            SensorKey::Voc => "voc",
            SensorKey::VmcStatus => "vmc_status",
        }
    }

    /// Human readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SensorKey::TempIndoor => "Indoor Temperature",
            SensorKey::TempOutdoor => "Outdoor Temperature",
            SensorKey::Humidity => "Humidity",
            SensorKey::Co2 => "CO2",
            SensorKey::Voc => "VOC",
            SensorKey::VmcStatus => "VMC Status",
        }
    }
}

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping of one raw status-log field to an output metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorField {
    /// Field name as it appears in the status log.
    pub field: &'static str,
    /// Output metric.
    pub key: SensorKey,
    /// Raw values are divided by this, `None` means the raw value is kept.
    pub divisor: Option<f64>,
    /// Unit of the converted value.
    pub unit: &'static str,
}

/// The fixed status-log field table.
pub const SENSOR_FIELDS: [SensorField; 6] = [
    SensorField {
        field: "TemperaturaInterna",
        key: SensorKey::TempIndoor,
        divisor: Some(10.0),
        unit: "°C",
    },
    SensorField {
        field: "TemperaturaEsterna",
        key: SensorKey::TempOutdoor,
        divisor: Some(10.0),
        unit: "°C",
    },
    SensorField {
        field: "Humidity",
        key: SensorKey::Humidity,
        divisor: Some(10.0),
        unit: "%",
    },
    SensorField {
        field: "Anidride",
        key: SensorKey::Co2,
        divisor: Some(1.0),
        unit: "ppm",
    },
    SensorField {
        field: "Isobutilene",
        key: SensorKey::Voc,
        divisor: Some(1.0),
        unit: "ppb",
    },
    SensorField {
        field: "VMCStatus",
        key: SensorKey::VmcStatus,
        divisor: None,
        unit: "",
    },
];

impl SensorField {
    /// Look up a raw field name in [`SENSOR_FIELDS`].
    #[must_use]
    pub fn lookup(field: &str) -> Option<&'static SensorField> {
        SENSOR_FIELDS.iter().find(|f| f.field == field)
    }

    /// Look up the table entry for an output metric.
    #[must_use]
    pub fn for_key(key: SensorKey) -> &'static SensorField {
        let index = match key {
            SensorKey::TempIndoor => 0,
            SensorKey::TempOutdoor => 1,
            SensorKey::Humidity => 2,
            SensorKey::Co2 => 3,
            SensorKey::Voc => 4,
            SensorKey::VmcStatus => 5,
        };
        &SENSOR_FIELDS[index]
    }

    /// Convert a raw value.
    ///
    /// With a divisor other than 1 the result is `raw / divisor` rounded to one
    /// decimal place; otherwise the raw value is returned unchanged.
    #[must_use]
    pub fn convert(&self, raw: f64) -> f64 {
        match self.divisor {
            Some(divisor) if divisor != 1.0 => round_one_decimal(raw / divisor),
            _ => raw,
        }
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Telemetry produced by one status poll.
///
/// Every metric is independently optional: it is `None` when the status log
/// did not carry the corresponding field. Readings are never merged with a
/// previous poll.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    /// Indoor temperature in °C.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub temp_indoor: Option<f64>,
    /// Outdoor temperature in °C.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub temp_outdoor: Option<f64>,
    /// Relative humidity in %.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub humidity: Option<f64>,
    /// CO2 concentration in ppm.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub co2: Option<f64>,
    /// VOC concentration in ppb.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub voc: Option<f64>,
    /// Raw operating mode code, see [`VmcStatus`].
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub vmc_status: Option<i64>,
}

impl SensorReading {
    /// Record one raw status-log field.
    ///
    /// Returns `false` and leaves the reading untouched when the field name is
    /// not in [`SENSOR_FIELDS`], or when a status code is not integral.
    pub fn record(&mut self, field: &str, raw: f64) -> bool {
        let Some(entry) = SensorField::lookup(field) else {
            return false;
        };
        let value = entry.convert(raw);
        match entry.key {
            SensorKey::TempIndoor => self.temp_indoor = Some(value),
            SensorKey::TempOutdoor => self.temp_outdoor = Some(value),
            SensorKey::Humidity => self.humidity = Some(value),
            SensorKey::Co2 => self.co2 = Some(value),
            SensorKey::Voc => self.voc = Some(value),
            SensorKey::VmcStatus => {
                if value.fract() != 0.0 {
                    return false;
                }
                self.vmc_status = Some(value as i64);
            }
        }
        true
    }

    /// Value of a metric as a float.
    #[must_use]
    pub fn get(&self, key: SensorKey) -> Option<f64> {
        match key {
            SensorKey::TempIndoor => self.temp_indoor,
            SensorKey::TempOutdoor => self.temp_outdoor,
            SensorKey::Humidity => self.humidity,
            SensorKey::Co2 => self.co2,
            SensorKey::Voc => self.voc,
            SensorKey::VmcStatus => self.vmc_status.map(|s| s as f64),
        }
    }

    /// Present metrics in [`SensorKey::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (SensorKey, f64)> + '_ {
        SensorKey::ALL
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
    }

    /// Number of metrics present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True when the poll produced no recognised field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Operating mode, if the status code is present and known.
    #[must_use]
    pub fn status(&self) -> Option<VmcStatus> {
        self.vmc_status
            .and_then(|code| VmcStatus::try_from(code).ok())
    }
}

/// Operating mode reported by the unit.
///
/// The client does not enforce transitions between these states: they change
/// as a side effect of commands (from this client or anyone else) and are only
/// observed through the next status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum VmcStatus {
    Off = 0,
    Normal = 1,
    Hyperventilation = 2,
    Night = 3,
    Cooling = 4,
}

impl VmcStatus {
    /// Whether the unit is ventilating at all.
    #[must_use]
    pub fn is_on(&self) -> bool {
        *self != VmcStatus::Off
    }
}

impl TryFrom<i64> for VmcStatus {
    type Error = ParseError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(VmcStatus::Off),
            1 => Ok(VmcStatus::Normal),
            2 => Ok(VmcStatus::Hyperventilation),
            3 => Ok(VmcStatus::Night),
            4 => Ok(VmcStatus::Cooling),
            other => Err(ParseError::UnknownStatus(other)),
        }
    }
}

impl fmt::Display for VmcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VmcStatus::Off => "Off",
            VmcStatus::Normal => "Normal",
            VmcStatus::Hyperventilation => "Hyperventilation",
            VmcStatus::Night => "Night",
            VmcStatus::Cooling => "Cooling",
        };
        f.write_str(name)
    }
}
