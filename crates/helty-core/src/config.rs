//! Client configuration.
//!
//! Every field has a default matching the production Helty cloud, so an empty
//! TOML table (or `ClientConfig::default()`) is a working configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Base URL of the Helty cloud API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.hcloud.heltyair.com";
/// Region of the identity provider.
pub const DEFAULT_REGION: &str = "eu-central-1";
/// Pre-registered app client id at the identity provider.
pub const DEFAULT_CLIENT_ID: &str = "7k0c21g92bk3413frij8rso6rk";

/// Configuration for [`HeltyClient`](crate::HeltyClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the cloud API.
    pub api_base_url: String,
    /// Identity provider region, used to derive the endpoint.
    pub region: String,
    /// Explicit identity provider endpoint (overrides `region`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_url: Option<String>,
    /// App client id registered at the identity provider.
    pub client_id: String,
    /// Timeout applied to every HTTP request, in seconds.
    pub request_timeout_secs: u64,
    /// Wait between the GetStatus command and the status log lookup, in seconds.
    ///
    /// This is how long the unit usually takes to publish its status back to
    /// the cloud. Shorter values risk reading a stale status, longer values
    /// add latency to every read.
    pub status_read_delay_secs: u64,
    /// How long before the provider-declared expiry a token is renewed, in seconds.
    pub expiry_margin_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            region: DEFAULT_REGION.to_string(),
            identity_url: None,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            request_timeout_secs: 15,
            status_read_delay_secs: 4,
            expiry_margin_secs: 300,
        }
    }
}

impl ClientConfig {
    /// Identity provider endpoint.
    pub fn identity_endpoint(&self) -> String {
        match &self.identity_url {
            Some(url) => url.clone(),
            None => format!("https://cognito-idp.{}.amazonaws.com/", self.region),
        }
    }

    /// API base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn status_read_delay(&self) -> Duration {
        Duration::from_secs(self.status_read_delay_secs)
    }

    pub fn expiry_margin(&self) -> Duration {
        Duration::from_secs(self.expiry_margin_secs)
    }

    /// Set the API base URL.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set an explicit identity provider endpoint.
    #[must_use]
    pub fn with_identity_url(mut self, url: impl Into<String>) -> Self {
        self.identity_url = Some(url.into());
        self
    }

    /// Set the settle delay of the sensor read protocol.
    #[must_use]
    pub fn with_status_read_delay(mut self, delay: Duration) -> Self {
        self.status_read_delay_secs = delay.as_secs();
        self
    }

    /// Validate the configuration.
    ///
    /// Rejects non-http(s) URLs, an empty region or client id, and a zero
    /// request timeout.
    pub fn validate(&self) -> Result<()> {
        check_url("api_base_url", &self.api_base_url)?;
        if let Some(url) = &self.identity_url {
            check_url("identity_url", url)?;
        } else if self.region.trim().is_empty() {
            return Err(Error::invalid_config("region cannot be empty"));
        }
        if self.client_id.trim().is_empty() {
            return Err(Error::invalid_config("client_id cannot be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::invalid_config(
                "request_timeout_secs must be greater than 0",
            ));
        }
        Ok(())
    }
}

fn check_url(field: &str, url: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(Error::invalid_config(format!(
            "{} must start with http:// or https://, got: {}",
            field, url
        )))
    }
}
