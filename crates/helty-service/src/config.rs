//! Service configuration.
//!
//! Credentials are not part of the file. They come from the environment or the
//! command line only.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use helty_core::ClientConfig;

/// Shortest accepted poll interval.
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;
/// Longest accepted poll interval.
pub const MAX_POLL_INTERVAL_SECS: u64 = 3600;

/// Service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cloud client settings.
    pub client: ClientConfig,
    /// Sensor polling settings.
    pub poller: PollerConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// # Example
    ///
    /// ```
    /// use helty_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if let Err(e) = self.client.validate() {
            errors.push(ValidationError {
                field: "client".to_string(),
                message: e.to_string(),
            });
        }
        errors.extend(self.poller.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Sensor polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Seconds between two sensor reads of the same device.
    pub interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate poller configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&self.interval_secs) {
            errors.push(ValidationError {
                field: "poller.interval_secs".to_string(),
                message: format!(
                    "must be between {} and {} seconds, got {}",
                    MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS, self.interval_secs
                ),
            });
        }
        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `poller.interval_secs`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("helty")
        .join("service.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.poller.interval_secs, 60);
        assert_eq!(config.client, ClientConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [client]
            api_base_url = "https://api.example.test"
            status_read_delay_secs = 6

            [poller]
            interval_secs = 120
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.client.api_base_url, "https://api.example.test");
        assert_eq!(config.client.status_read_delay_secs, 6);
        assert_eq!(config.client.request_timeout_secs, 15);
        assert_eq!(config.poller.interval(), Duration::from_secs(120));
    }

    #[test]
    fn test_config_empty_toml_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("service.toml");

        let config = Config {
            client: ClientConfig::default().with_identity_url("https://idp.example.test/"),
            poller: PollerConfig { interval_secs: 30 },
        };

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/service.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_validate_interval_bounds() {
        for secs in [10, 60, 3600] {
            assert!(PollerConfig { interval_secs: secs }.validate().is_empty());
        }
        for secs in [0, 9, 3601] {
            let errors = PollerConfig { interval_secs: secs }.validate();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field, "poller.interval_secs");
        }
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.client.request_timeout_secs = 0;
        config.poller.interval_secs = 1;

        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 2);
        let message = ConfigError::Validation(errors).to_string();
        assert!(message.contains("poller.interval_secs"));
        assert!(message.contains("client"));
    }

    #[test]
    fn test_load_validated_rejects_bad_interval() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("service.toml");
        std::fs::write(&config_path, "[poller]\ninterval_secs = 5\n").unwrap();

        assert!(matches!(
            Config::load_validated(&config_path),
            Err(ConfigError::Validation(_))
        ));
    }
}
