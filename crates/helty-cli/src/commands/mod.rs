//! Command implementations for the CLI.

mod catalogue;
mod devices;
mod sensors;
mod send;

pub use catalogue::cmd_commands;
pub use devices::cmd_devices;
pub use sensors::cmd_sensors;
pub use send::cmd_send;
