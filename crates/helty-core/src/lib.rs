//! Cloud client for Helty VMC ventilation units.
//!
//! Helty units are not reachable on the local network: they are controlled
//! through the Helty cloud, which relays commands to the board and stores the
//! status the board publishes back. This crate talks to that cloud.
//!
//! # Features
//!
//! - **Session management**: password login against the Cognito user pool,
//!   proactive token renewal with refresh-then-login fallback
//! - **Single retry on 401**: a rejected token is renewed and the request
//!   sent once more
//! - **Discovery**: list the ventilation units owned by the account
//! - **Commands**: send any command id to a board
//! - **Sensor reads**: GetStatus, settle delay, status log lookup
//! - **Test doubles**: [`mock`] backends for the identity provider and the
//!   transport
//!
//! # Quick Start
//!
//! ```no_run
//! use helty_core::{ClientConfig, HeltyClient};
//! use helty_types::CommandId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HeltyClient::new(ClientConfig::default())?;
//!     client.authenticate("owner@example.com", "secret").await?;
//!
//!     let devices = client.find_devices().await?;
//!     println!("Found {} devices", devices.len());
//!
//!     if let Some(device) = devices.first() {
//!         client.send_command(&device.board_serial_number, CommandId::NIGHT).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod identity;
pub mod mock;
pub mod readings;
pub mod session;
pub mod transport;

pub use client::{
    HeltyClient, LAST_STATUS_PATH, PRODUCT_PAGE_SIZE, PRODUCT_SEARCH_PATH, SEND_COMMAND_PATH,
};
pub use config::ClientConfig;
pub use discovery::devices_from_search;
pub use error::{AuthFailureReason, ConnectionFailureReason, Error, Result};
pub use identity::{
    AuthOutcome, AuthRequest, AuthenticationResult, CognitoIdentityProvider, IdentityProvider,
};
pub use readings::parse_sensor_data;
pub use session::{Credentials, DEFAULT_TOKEN_LIFETIME, SessionManager, TokenState};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

/// Type alias for a shared client.
///
/// `HeltyClient` is not `Clone`; share it across tasks behind an `Arc`.
pub type SharedClient = std::sync::Arc<HeltyClient>;

// Re-export from helty-types
pub use helty_types::{CommandId, Device, SensorReading, VmcStatus};
