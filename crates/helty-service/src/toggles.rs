//! Assumed state of on/off features.
//!
//! The cloud never reports whether the LED panel, sensor mode or standby are
//! enabled. The only thing known is the last command sent, so that is what is
//! kept, and it is always presented as assumed.

use std::fmt;

use serde::Serialize;

use helty_types::ToggleKind;

/// Last commanded state of every toggle; `None` until a command is sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ToggleStates {
    pub led: Option<bool>,
    pub sensor_mode: Option<bool>,
    pub standby: Option<bool>,
}

impl ToggleStates {
    pub fn get(&self, kind: ToggleKind) -> Option<bool> {
        match kind {
            ToggleKind::Led => self.led,
            ToggleKind::SensorMode => self.sensor_mode,
            ToggleKind::Standby => self.standby,
        }
    }

    /// Record a command that the cloud accepted.
    pub fn record(&mut self, kind: ToggleKind, on: bool) {
        let slot = match kind {
            ToggleKind::Led => &mut self.led,
            ToggleKind::SensorMode => &mut self.sensor_mode,
            ToggleKind::Standby => &mut self.standby,
        };
        *slot = Some(on);
    }

    pub fn assumed(&self, kind: ToggleKind) -> AssumedToggle {
        AssumedToggle {
            kind,
            on: self.get(kind),
        }
    }

    /// All toggles in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = AssumedToggle> + '_ {
        ToggleKind::ALL.into_iter().map(|kind| self.assumed(kind))
    }
}

/// A toggle state as shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssumedToggle {
    pub kind: ToggleKind,
    pub on: Option<bool>,
}

impl fmt::Display for AssumedToggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.on {
            Some(true) => write!(f, "{}: on (assumed)", self.kind.label()),
            Some(false) => write!(f, "{}: off (assumed)", self.kind.label()),
            None => write!(f, "{}: unknown", self.kind.label()),
        }
    }
}
