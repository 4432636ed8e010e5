//! Fan-style control mapping: presets, speed levels and percentages.
//!
//! The unit exposes four discrete speeds plus a few special modes. Hosts that
//! model it as a fan with a percentage and named presets translate through the
//! functions here.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::commands::CommandId;
use crate::error::ParseError;
use crate::types::VmcStatus;

/// Number of discrete speed levels.
pub const SPEED_COUNT: u8 = 4;

/// Named operating presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Preset {
    Normal,
    Night,
    Hyper,
    Cooling,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Normal, Preset::Night, Preset::Hyper, Preset::Cooling];

    /// Command that selects this preset. `Normal` selects speed 1.
    #[must_use]
    pub fn command(&self) -> CommandId {
        match self {
            Preset::Normal => CommandId::SET_SPEED_1,
            Preset::Night => CommandId::NIGHT,
            Preset::Hyper => CommandId::HYPER,
            Preset::Cooling => CommandId::COOLING,
        }
    }

    /// Preset matching a reported status; `Off` has none.
    #[must_use]
    pub fn from_status(status: VmcStatus) -> Option<Preset> {
        match status {
            VmcStatus::Off => None,
            VmcStatus::Normal => Some(Preset::Normal),
            VmcStatus::Hyperventilation => Some(Preset::Hyper),
            VmcStatus::Night => Some(Preset::Night),
            VmcStatus::Cooling => Some(Preset::Cooling),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Normal => "normal",
            Preset::Night => "night",
            Preset::Hyper => "hyper",
            Preset::Cooling => "cooling",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::UnknownPreset(s.to_string()))
    }
}

/// Command selecting a speed level (1..=4).
///
/// # Errors
///
/// Returns [`ParseError::InvalidValue`] for levels outside 1..=[`SPEED_COUNT`].
pub fn speed_command(level: u8) -> Result<CommandId, ParseError> {
    match level {
        1 => Ok(CommandId::SET_SPEED_1),
        2 => Ok(CommandId::SET_SPEED_2),
        3 => Ok(CommandId::SET_SPEED_3),
        4 => Ok(CommandId::SET_SPEED_4),
        other => Err(ParseError::InvalidValue(format!(
            "speed level must be 1-{}, got {}",
            SPEED_COUNT, other
        ))),
    }
}

/// Speed level for a percentage, `None` for 0% (off).
///
/// Levels are `ceil(pct / 25)`, clamped to 1..=4.
#[must_use]
pub fn percentage_to_level(percentage: u8) -> Option<u8> {
    if percentage == 0 {
        return None;
    }
    let step = 100 / u32::from(SPEED_COUNT);
    let level = u32::from(percentage).div_ceil(step);
    Some(level.clamp(1, u32::from(SPEED_COUNT)) as u8)
}

/// Command that realises a percentage: power off for 0%, a speed otherwise.
#[must_use]
pub fn command_for_percentage(percentage: u8) -> CommandId {
    match percentage_to_level(percentage) {
        None => CommandId::POWER_OFF,
        Some(level) => speed_command(level).unwrap_or(CommandId::SET_SPEED_1),
    }
}

/// Approximate percentage for a reported status.
///
/// The status log does not say which speed is active, so every running mode
/// except hyperventilation is shown as the first level.
#[must_use]
pub fn approximate_percentage(status: VmcStatus) -> u8 {
    match status {
        VmcStatus::Off => 0,
        VmcStatus::Hyperventilation => 100,
        VmcStatus::Normal | VmcStatus::Night | VmcStatus::Cooling => 25,
    }
}
