//! Platform-agnostic types for Helty VMC ventilation units.
//!
//! This crate holds the value types shared by the cloud client
//! (helty-core), the background service and the CLI.
//!
//! # Features
//!
//! - Discovered [`Device`] records
//! - [`SensorReading`] and the fixed status-log [`SENSOR_FIELDS`] table
//! - The [`VmcStatus`] operating modes
//! - The named command catalogue and on/off [`ToggleKind`]s
//! - Fan preset and speed mapping
//!
//! # Example
//!
//! ```
//! use helty_types::{CommandId, SensorReading};
//!
//! let mut reading = SensorReading::default();
//! reading.record("Humidity", 503.0);
//! assert_eq!(reading.humidity, Some(50.3));
//!
//! let id: CommandId = "night".parse().unwrap();
//! assert_eq!(id, CommandId::NIGHT);
//! ```

pub mod commands;
pub mod error;
pub mod fan;
pub mod types;

pub use commands::{CATALOGUE, CommandCategory, CommandId, NamedCommand, ToggleKind};
pub use error::{ParseError, ParseResult};
pub use fan::{Preset, SPEED_COUNT};
pub use types::{Device, SENSOR_FIELDS, SensorField, SensorKey, SensorReading, VmcStatus};
