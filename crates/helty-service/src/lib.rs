//! Background poller and session registry for Helty VMC units.
//!
//! This crate provides a service that:
//! - Signs in to the Helty cloud and discovers the account's units
//! - Polls every unit's sensors on a schedule
//! - Tracks the assumed state of the write-only toggles
//! - Keeps any number of independent sessions open by name
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/helty/service.toml`:
//!
//! ```toml
//! [client]
//! region = "eu-central-1"
//! request_timeout_secs = 15
//! status_read_delay_secs = 4
//!
//! [poller]
//! interval_secs = 60
//! ```
//!
//! Credentials are never read from the file. Pass them with `--email` and
//! `--password` or the `HELTY_EMAIL` and `HELTY_PASSWORD` variables.

pub mod config;
pub mod poller;
pub mod registry;
pub mod toggles;

pub use config::{Config, ConfigError, PollerConfig, ValidationError, default_config_path};
pub use poller::{PollError, PollState, PolledReading, Poller};
pub use registry::{DeviceSession, RegistryError, Session, SessionRegistry};
pub use toggles::{AssumedToggle, ToggleStates};
