//! Command identifiers understood by the Helty cloud.
//!
//! Commands are opaque integers. The cloud forwards them to the board over its
//! own messaging channel and never reports an acknowledgement, so nothing here
//! describes what a command does beyond its name.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A command identifier.
///
/// Any integer is accepted; the catalogue below only gives names to the ids
/// known to work on current firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CommandId(pub i32);

impl CommandId {
    pub const GET_STATUS: CommandId = CommandId(0);
    pub const GET_INFO: CommandId = CommandId(1);
    pub const POWER_OFF: CommandId = CommandId(20);
    pub const COOLING: CommandId = CommandId(21);
    pub const NIGHT: CommandId = CommandId(22);
    pub const HYPER: CommandId = CommandId(23);
    pub const SPEED_PLUS: CommandId = CommandId(24);
    pub const SPEED_MINUS: CommandId = CommandId(25);
    pub const GET_PARAM_SPEED: CommandId = CommandId(32);
    pub const GET_PARAM_TRIGGER: CommandId = CommandId(33);
    pub const GET_PARAM_FILTER: CommandId = CommandId(36);
    pub const RESET_FILTER: CommandId = CommandId(37);
    pub const ENABLE_SENSOR: CommandId = CommandId(38);
    pub const DISABLE_SENSOR: CommandId = CommandId(39);
    pub const ENABLE_STANDBY: CommandId = CommandId(40);
    pub const DISABLE_STANDBY: CommandId = CommandId(41);
    pub const ENABLE_LED: CommandId = CommandId(42);
    pub const DISABLE_LED: CommandId = CommandId(43);
    pub const SET_SPEED_1: CommandId = CommandId(44);
    pub const SET_SPEED_2: CommandId = CommandId(45);
    pub const SET_SPEED_3: CommandId = CommandId(46);
    pub const SET_SPEED_4: CommandId = CommandId(47);
    pub const GET_LIGHT_LED: CommandId = CommandId(48);

    /// Catalogue entry for this id, if it has a name.
    #[must_use]
    pub fn named(&self) -> Option<&'static NamedCommand> {
        CATALOGUE.iter().find(|c| c.id == *self)
    }
}

impl From<i32> for CommandId {
    fn from(value: i32) -> Self {
        CommandId(value)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CommandId {
    type Err = ParseError;

    /// Parse a catalogue name (`"night"`, `"speed2"`) or a raw integer id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(raw) = s.parse::<i32>() {
            return Ok(CommandId(raw));
        }
        NamedCommand::find(s)
            .map(|c| c.id)
            .ok_or_else(|| ParseError::UnknownCommand(s.to_string()))
    }
}

/// Grouping used when listing the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CommandCategory {
    Status,
    Speed,
    Mode,
    Sensor,
    Led,
    Other,
    Debug,
}

impl CommandCategory {
    /// All categories in listing order.
    pub const ALL: [CommandCategory; 7] = [
        CommandCategory::Status,
        CommandCategory::Speed,
        CommandCategory::Mode,
        CommandCategory::Sensor,
        CommandCategory::Led,
        CommandCategory::Other,
        CommandCategory::Debug,
    ];

    /// Catalogue entries in this category.
    pub fn commands(self) -> impl Iterator<Item = &'static NamedCommand> {
        CATALOGUE.iter().filter(move |c| c.category == self)
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandCategory::Status => "Status",
            CommandCategory::Speed => "Speed",
            CommandCategory::Mode => "Mode",
            CommandCategory::Sensor => "Sensor",
            CommandCategory::Led => "LED",
            CommandCategory::Other => "Other",
            CommandCategory::Debug => "Debug",
        };
        f.write_str(name)
    }
}

/// A named entry of the command catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedCommand {
    /// Short name used on the command line.
    pub name: &'static str,
    /// Cloud command id.
    pub id: CommandId,
    /// Firmware-side name of the command.
    pub label: &'static str,
    /// One line description.
    pub description: &'static str,
    pub category: CommandCategory,
}

impl NamedCommand {
    /// Find a catalogue entry by its short name (case-insensitive).
    #[must_use]
    pub fn find(name: &str) -> Option<&'static NamedCommand> {
        CATALOGUE
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

const fn entry(
    name: &'static str,
    id: CommandId,
    label: &'static str,
    description: &'static str,
    category: CommandCategory,
) -> NamedCommand {
    NamedCommand {
        name,
        id,
        label,
        description,
        category,
    }
}

/// Every named command.
#[rustfmt::skip]
pub const CATALOGUE: &[NamedCommand] = &[
    entry("status", CommandId::GET_STATUS, "GetStatus", "Read current status, temperatures, humidity, CO2, VOC", CommandCategory::Status),
    entry("info", CommandId::GET_INFO, "GetInfo", "Get device info (IP, firmware versions)", CommandCategory::Status),
    entry("speed1", CommandId::SET_SPEED_1, "SetSpeed1", "Set speed 1 (low)", CommandCategory::Speed),
    entry("speed2", CommandId::SET_SPEED_2, "SetSpeed2", "Set speed 2 (medium-low)", CommandCategory::Speed),
    entry("speed3", CommandId::SET_SPEED_3, "SetSpeed3", "Set speed 3 (medium-high)", CommandCategory::Speed),
    entry("speed4", CommandId::SET_SPEED_4, "SetSpeed4", "Set speed 4 (high)", CommandCategory::Speed),
    entry("speed+", CommandId::SPEED_PLUS, "SpeedPlus", "Increase speed by 1", CommandCategory::Speed),
    entry("speed-", CommandId::SPEED_MINUS, "SpeedLess", "Decrease speed by 1", CommandCategory::Speed),
    entry("night", CommandId::NIGHT, "Night", "Night (silent) mode", CommandCategory::Mode),
    entry("hyper", CommandId::HYPER, "Hyperventilation", "Hyperventilation (boost) mode", CommandCategory::Mode),
    entry("cooling", CommandId::COOLING, "Cooling", "Free cooling/heating mode", CommandCategory::Mode),
    entry("off", CommandId::POWER_OFF, "PowerOff", "Turn VMC off", CommandCategory::Mode),
    entry("sensor-on", CommandId::ENABLE_SENSOR, "EnableSensor", "Enable automatic sensor mode", CommandCategory::Sensor),
    entry("sensor-off", CommandId::DISABLE_SENSOR, "DisableSensor", "Disable sensor mode", CommandCategory::Sensor),
    entry("led-on", CommandId::ENABLE_LED, "EnableLightLed", "Turn LED panel on", CommandCategory::Led),
    entry("led-off", CommandId::DISABLE_LED, "DisableLightLed", "Turn LED panel off", CommandCategory::Led),
    entry("standby-on", CommandId::ENABLE_STANDBY, "EnableStandby", "Enable standby", CommandCategory::Other),
    entry("standby-off", CommandId::DISABLE_STANDBY, "DisableStandby", "Disable standby", CommandCategory::Other),
    entry("reset-filter", CommandId::RESET_FILTER, "ResetFilter", "Reset filter counter", CommandCategory::Other),
    entry("get-speeds", CommandId::GET_PARAM_SPEED, "GetParamSpeed", "Get fan speed parameters", CommandCategory::Debug),
    entry("get-triggers", CommandId::GET_PARAM_TRIGGER, "GetParamTrigger", "Get sensor trigger parameters", CommandCategory::Debug),
    entry("get-filter", CommandId::GET_PARAM_FILTER, "GetParamFilter", "Get filter parameters", CommandCategory::Debug),
    entry("get-led", CommandId::GET_LIGHT_LED, "GetLightLed", "Get LED intensity", CommandCategory::Debug),
];

/// On/off features whose state the cloud never reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ToggleKind {
    Led,
    SensorMode,
    Standby,
}

impl ToggleKind {
    pub const ALL: [ToggleKind; 3] = [ToggleKind::Led, ToggleKind::SensorMode, ToggleKind::Standby];

    /// Command that switches the feature on.
    #[must_use]
    pub fn on_command(&self) -> CommandId {
        match self {
            ToggleKind::Led => CommandId::ENABLE_LED,
            ToggleKind::SensorMode => CommandId::ENABLE_SENSOR,
            ToggleKind::Standby => CommandId::ENABLE_STANDBY,
        }
    }

    /// Command that switches the feature off.
    #[must_use]
    pub fn off_command(&self) -> CommandId {
        match self {
            ToggleKind::Led => CommandId::DISABLE_LED,
            ToggleKind::SensorMode => CommandId::DISABLE_SENSOR,
            ToggleKind::Standby => CommandId::DISABLE_STANDBY,
        }
    }

    /// Command for the requested state.
    #[must_use]
    pub fn command(&self, on: bool) -> CommandId {
        if on { self.on_command() } else { self.off_command() }
    }

    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            ToggleKind::Led => "led",
            ToggleKind::SensorMode => "sensor_mode",
            ToggleKind::Standby => "standby",
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ToggleKind::Led => "LED",
            ToggleKind::SensorMode => "Sensor Mode",
            ToggleKind::Standby => "Standby",
        }
    }
}

impl FromStr for ToggleKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToggleKind::ALL
            .into_iter()
            .find(|t| t.key().eq_ignore_ascii_case(s) || t.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::InvalidValue(format!("unknown toggle '{}'", s)))
    }
}
