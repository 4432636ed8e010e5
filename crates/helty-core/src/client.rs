//! Client for the Helty cloud API.
//!
//! [`HeltyClient`] combines a [`SessionManager`] with a [`Transport`] and
//! exposes the three cloud operations the integration needs: product search,
//! command dispatch and the status-log lookup. [`HeltyClient::read_sensors`]
//! chains the last two into the sensor read protocol.
//!
//! # Example
//!
//! ```no_run
//! use helty_core::{ClientConfig, HeltyClient};
//!
//! # async fn demo() -> helty_core::Result<()> {
//! let client = HeltyClient::new(ClientConfig::default())?;
//! client.authenticate("owner@example.com", "secret").await?;
//!
//! for device in client.find_devices().await? {
//!     let reading = client
//!         .read_sensors(&device.board_serial_number, &device.serial_number)
//!         .await?;
//!     println!("{}: {:?}", device.display_name(), reading.temp_indoor);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use reqwest::Method;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use helty_types::{CommandId, Device, SensorReading};

use crate::config::ClientConfig;
use crate::discovery::devices_from_search;
use crate::error::{AuthFailureReason, ConnectionFailureReason, Error, Result};
use crate::identity::{CognitoIdentityProvider, IdentityProvider};
use crate::readings::parse_sensor_data;
use crate::session::{SessionManager, TokenState};
use crate::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

/// Product search endpoint.
pub const PRODUCT_SEARCH_PATH: &str = "/board/product/search";
/// Command dispatch endpoint, followed by the board serial number.
pub const SEND_COMMAND_PATH: &str = "/board/board/sendcommand";
/// Last status log endpoint.
pub const LAST_STATUS_PATH: &str = "/log/commandlogs/laststatus";

/// Products requested per search. Larger fleets are not paginated.
pub const PRODUCT_PAGE_SIZE: u32 = 50;

/// Authenticated client for one Helty cloud account.
pub struct HeltyClient {
    config: ClientConfig,
    session: SessionManager,
    transport: Arc<dyn Transport>,
}

impl HeltyClient {
    /// Create a client talking to the configured cloud over HTTPS.
    ///
    /// The identity provider and the API share one connection pool.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        let provider = CognitoIdentityProvider::with_client(&config, transport.client().clone());
        Ok(Self::with_backends(
            config,
            Arc::new(provider),
            Arc::new(transport),
        ))
    }

    /// Create a client with custom identity and transport backends.
    pub fn with_backends(
        config: ClientConfig,
        provider: Arc<dyn IdentityProvider>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let session = SessionManager::new(provider, config.expiry_margin());
        Self {
            config,
            session,
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Log in with email and password.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<TokenState> {
        self.session.authenticate(email, password).await
    }

    /// Current bearer token, if authenticated.
    pub async fn id_token(&self) -> Option<String> {
        self.session.id_token().await
    }

    /// Send an authenticated request and decode its JSON body.
    ///
    /// If the API answers 401 the token is expired, renewed, and the request
    /// sent again once. A second 401 is reported as
    /// [`ConnectionFailureReason::Unauthorized`]. An empty 2xx body decodes to
    /// an empty object.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = format!("{}{}", self.config.api_base(), path);

        let token = self.bearer_token().await?;
        let response = self.send(&method, &url, body, &token).await?;
        if !response.is_unauthorized() {
            return decode(response);
        }

        warn!(%method, path, "request unauthorized, renewing token and retrying once");
        self.session.force_expiry(&token).await;
        let token = self.bearer_token().await?;
        let response = self.send(&method, &url, body, &token).await?;
        decode(response)
    }

    /// List the devices owned by the authenticated account.
    pub async fn find_devices(&self) -> Result<Vec<Device>> {
        let payload = json!({
            "pageSize": PRODUCT_PAGE_SIZE,
            "pageNumber": 0,
            "status": "OK",
        });
        let page = self
            .request(Method::POST, PRODUCT_SEARCH_PATH, Some(&payload))
            .await?;

        let email = self.session.email().await;
        let devices = devices_from_search(&page, email.as_deref());
        info!(count = devices.len(), "discovered devices");
        Ok(devices)
    }

    /// Send a command without parameters.
    pub async fn send_command(&self, board_serial: &str, command: CommandId) -> Result<Value> {
        self.send_command_with_values(board_serial, command, &[])
            .await
    }

    /// Send a command to a board.
    ///
    /// The cloud only confirms that it accepted the command; the unit's
    /// reaction is only visible through a later status read.
    pub async fn send_command_with_values(
        &self,
        board_serial: &str,
        command: CommandId,
        values: &[Value],
    ) -> Result<Value> {
        let path = format!("{}/{}", SEND_COMMAND_PATH, board_serial);
        let payload = json!({ "commandId": command, "values": values });

        debug!(board_serial, %command, "sending command");
        let response = self.request(Method::POST, &path, Some(&payload)).await?;
        Ok(match response {
            Value::Null => Value::Object(Map::new()),
            other => other,
        })
    }

    /// Fetch the raw last status log of a device.
    pub async fn last_status(&self, device_serial: &str) -> Result<Value> {
        let payload = json!({ "serialNumber": device_serial });
        self.request(Method::POST, LAST_STATUS_PATH, Some(&payload))
            .await
    }

    /// Read the current sensor values of a device.
    ///
    /// Sends GetStatus to the board, waits for the configured settle delay
    /// so the unit can publish its status, then reads the status log. The
    /// three steps always run in this order.
    pub async fn read_sensors(
        &self,
        board_serial: &str,
        device_serial: &str,
    ) -> Result<SensorReading> {
        self.send_command(board_serial, CommandId::GET_STATUS).await?;

        let delay = self.config.status_read_delay();
        debug!(board_serial, delay_ms = delay.as_millis() as u64, "waiting for status update");
        tokio::time::sleep(delay).await;

        let raw = self.last_status(device_serial).await?;
        let reading = parse_sensor_data(&raw);
        debug!(device_serial, fields = reading.len(), "sensor data read");
        Ok(reading)
    }

    async fn bearer_token(&self) -> Result<String> {
        self.session.ensure_fresh_token().await?;
        self.session
            .id_token()
            .await
            .ok_or(Error::Auth(AuthFailureReason::NoCredentials))
    }

    async fn send(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<ApiResponse> {
        self.transport
            .execute(ApiRequest {
                method: method.clone(),
                url: url.to_string(),
                bearer_token: token.to_string(),
                body: body.cloned(),
            })
            .await
    }
}

fn decode(response: ApiResponse) -> Result<Value> {
    if response.is_unauthorized() {
        return Err(Error::Connection(ConnectionFailureReason::Unauthorized {
            body: response.body,
        }));
    }
    if !response.is_success() {
        return Err(Error::status(response.status, response.body));
    }
    if response.body.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(&response.body).map_err(|e| Error::malformed(e.to_string()))
}
