//! Open sessions, keyed by an owner-chosen name.
//!
//! Each [`Session`] holds one authenticated client, the devices discovered
//! when it was opened and a [`Poller`] per device. Sessions are created and
//! torn down explicitly; nothing is shared between them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use helty_core::{Credentials, HeltyClient};
use helty_types::fan::{self, Preset};
use helty_types::{CommandId, Device, ToggleKind};

use crate::config::Config;
use crate::poller::{PollState, Poller};
use crate::toggles::{AssumedToggle, ToggleStates};

/// Registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Client(#[from] helty_core::Error),
    #[error("No devices found for this account")]
    NoDevices,
    #[error("Unknown device: {0}")]
    UnknownDevice(String),
    #[error(transparent)]
    InvalidValue(#[from] helty_types::ParseError),
}

/// One device of an open session.
pub struct DeviceSession {
    device: Device,
    poller: Poller,
    toggles: RwLock<ToggleStates>,
}

impl DeviceSession {
    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    /// Latest poll state.
    pub fn state(&self) -> PollState {
        self.poller.state()
    }

    pub async fn toggles(&self) -> ToggleStates {
        *self.toggles.read().await
    }
}

/// An authenticated account with its devices and pollers.
pub struct Session {
    client: Arc<HeltyClient>,
    devices: Vec<DeviceSession>,
}

impl Session {
    /// Authenticate, discover devices and start polling them.
    ///
    /// # Errors
    ///
    /// Any authentication or discovery error, or
    /// [`RegistryError::NoDevices`] when the account owns no device.
    pub async fn start(
        client: HeltyClient,
        credentials: &Credentials,
        poll_interval: Duration,
    ) -> Result<Self, RegistryError> {
        client
            .authenticate(credentials.email(), credentials.password())
            .await?;
        let devices = client.find_devices().await?;
        if devices.is_empty() {
            return Err(RegistryError::NoDevices);
        }

        let client = Arc::new(client);
        let devices = devices
            .into_iter()
            .map(|device| DeviceSession {
                poller: Poller::spawn(Arc::clone(&client), device.clone(), poll_interval),
                device,
                toggles: RwLock::new(ToggleStates::default()),
            })
            .collect();

        Ok(Self { client, devices })
    }

    pub fn client(&self) -> &HeltyClient {
        &self.client
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceSession> {
        self.devices.iter()
    }

    /// Look up a device by serial number.
    pub fn device(&self, serial_number: &str) -> Option<&DeviceSession> {
        self.devices
            .iter()
            .find(|d| d.device.serial_number == serial_number)
    }

    fn require(&self, serial_number: &str) -> Result<&DeviceSession, RegistryError> {
        self.device(serial_number)
            .ok_or_else(|| RegistryError::UnknownDevice(serial_number.to_string()))
    }

    /// Send a command and schedule an immediate sensor refresh.
    pub async fn send_command(
        &self,
        serial_number: &str,
        command: CommandId,
    ) -> Result<Value, RegistryError> {
        let entry = self.require(serial_number)?;
        let response = self
            .client
            .send_command(&entry.device.board_serial_number, command)
            .await?;
        entry.poller.refresh_now();
        Ok(response)
    }

    /// Switch a toggle and remember the commanded state.
    pub async fn set_toggle(
        &self,
        serial_number: &str,
        kind: ToggleKind,
        on: bool,
    ) -> Result<AssumedToggle, RegistryError> {
        let entry = self.require(serial_number)?;
        // Held across the send so records land in command order.
        let mut toggles = entry.toggles.write().await;
        self.send_command(serial_number, kind.command(on)).await?;
        toggles.record(kind, on);
        Ok(toggles.assumed(kind))
    }

    pub async fn set_preset(
        &self,
        serial_number: &str,
        preset: Preset,
    ) -> Result<Value, RegistryError> {
        self.send_command(serial_number, preset.command()).await
    }

    /// Set a fan percentage; 0 turns the unit off.
    pub async fn set_percentage(
        &self,
        serial_number: &str,
        percentage: u8,
    ) -> Result<Value, RegistryError> {
        self.send_command(serial_number, fan::command_for_percentage(percentage))
            .await
    }

    pub async fn set_speed(&self, serial_number: &str, level: u8) -> Result<Value, RegistryError> {
        let command = fan::speed_command(level)?;
        self.send_command(serial_number, command).await
    }

    pub async fn turn_off(&self, serial_number: &str) -> Result<Value, RegistryError> {
        self.send_command(serial_number, CommandId::POWER_OFF).await
    }

    /// Stop every poller and forget the tokens.
    pub async fn shutdown(&self) {
        join_all(self.devices.iter().map(|d| d.poller.stop())).await;
        self.client.session().sign_out().await;
    }
}

/// Open sessions by key.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    opening: Mutex<()>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session against the cloud described by `config`.
    ///
    /// A session already open under `key` is closed first.
    pub async fn open(
        &self,
        key: &str,
        credentials: &Credentials,
        config: &Config,
    ) -> Result<Arc<Session>, RegistryError> {
        let client = HeltyClient::new(config.client.clone())?;
        self.open_with_client(key, client, credentials, config.poller.interval())
            .await
    }

    /// Open a session with a prepared client.
    ///
    /// Opens are serialized, so overlapping calls for the same key each close
    /// the session the previous one left behind.
    pub async fn open_with_client(
        &self,
        key: &str,
        client: HeltyClient,
        credentials: &Credentials,
        poll_interval: Duration,
    ) -> Result<Arc<Session>, RegistryError> {
        let _opening = self.opening.lock().await;
        self.close(key).await;

        let session = Arc::new(Session::start(client, credentials, poll_interval).await?);
        info!(
            "Opened session {} with {} device(s)",
            key,
            session.devices.len()
        );
        let replaced = self
            .sessions
            .write()
            .await
            .insert(key.to_string(), Arc::clone(&session));
        if let Some(old) = replaced {
            warn!("Session {} was replaced while opening, closing the old one", key);
            old.shutdown().await;
        }
        Ok(session)
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(key).cloned()
    }

    /// Close a session. Returns whether one was open under `key`.
    pub async fn close(&self, key: &str) -> bool {
        let removed = self.sessions.write().await.remove(key);
        match removed {
            Some(session) => {
                session.shutdown().await;
                info!("Closed session {}", key);
                true
            }
            None => {
                debug!("No session {} to close", key);
                false
            }
        }
    }

    /// Close every session.
    pub async fn close_all(&self) {
        let sessions: Vec<_> = self.sessions.write().await.drain().collect();
        join_all(sessions.iter().map(|(_, session)| session.shutdown())).await;
        info!("Closed {} session(s)", sessions.len());
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
