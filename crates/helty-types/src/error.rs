//! Error types for value conversions in helty-types.

use thiserror::Error;

/// Errors that can occur when converting raw values or names into typed values.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The command name is not part of the catalogue.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// The status code does not map to a known operating mode.
    #[error("Unknown VMC status code: {0}")]
    UnknownStatus(i64),

    /// The preset name is not recognised.
    #[error("Unknown preset mode: {0}")]
    UnknownPreset(String),

    /// A value was outside its accepted range.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Result type alias using helty-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
