//! Background sensor polling for one device.
//!
//! A [`Poller`] runs the sensor read protocol on a fixed interval and
//! publishes the outcome through a `watch` channel. Subscribers always see the
//! latest state; intermediate states may be skipped.
//!
//! A failed cycle, or one that returns no known field, marks the data as
//! unavailable until the next good read. The last good reading is kept so
//! callers can still show it, flagged stale.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use helty_core::HeltyClient;
use helty_types::{Device, SensorReading};

/// Failures after which logging goes quiet until the device recovers.
const LOUD_FAILURES: u32 = 3;

/// A reading together with the time it was captured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolledReading {
    pub reading: SensorReading,
    #[serde(with = "time::serde::rfc3339")]
    pub captured_at: OffsetDateTime,
}

/// Published state of a device's sensor data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PollState {
    /// Last good reading, kept across failures.
    pub latest: Option<PolledReading>,
    /// Whether the most recent cycle succeeded.
    pub available: bool,
    /// Error of the most recent failed cycle.
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub success_count: u64,
    pub failure_count: u64,
}

impl PollState {
    fn record_success(&mut self, reading: SensorReading) {
        self.latest = Some(PolledReading {
            reading,
            captured_at: OffsetDateTime::now_utc(),
        });
        self.available = true;
        self.last_error = None;
        self.consecutive_failures = 0;
        self.success_count += 1;
    }

    fn record_failure(&mut self, error: &PollError) {
        self.available = false;
        self.last_error = Some(error.to_string());
        self.consecutive_failures += 1;
        self.failure_count += 1;
    }

    /// Current reading, `None` when the data is unavailable.
    pub fn current(&self) -> Option<&SensorReading> {
        if self.available {
            self.latest.as_ref().map(|p| &p.reading)
        } else {
            None
        }
    }
}

/// Poll errors.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Failed to read sensors: {0}")]
    Read(#[from] helty_core::Error),
    #[error("Status log carried no sensor data")]
    EmptyReading,
}

/// Periodic sensor reader for one device.
pub struct Poller {
    serial_number: String,
    state_rx: watch::Receiver<PollState>,
    refresh: Arc<Notify>,
    stop_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    /// Start polling `device` every `period`. The first read starts immediately.
    pub fn spawn(client: Arc<HeltyClient>, device: Device, period: Duration) -> Self {
        let (state_tx, state_rx) = watch::channel(PollState::default());
        let (stop_tx, stop_rx) = watch::channel(false);
        let refresh = Arc::new(Notify::new());

        let serial_number = device.serial_number.clone();
        let task = tokio::spawn(run(
            client,
            device,
            period,
            state_tx,
            Arc::clone(&refresh),
            stop_rx,
        ));

        Self {
            serial_number,
            state_rx,
            refresh,
            stop_tx,
            task: Mutex::new(Some(task)),
        }
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PollState {
        self.state_rx.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state_rx.clone()
    }

    /// Run a cycle now instead of waiting for the next tick.
    ///
    /// Requests made while a cycle is running collapse into one extra cycle.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    /// Stop polling and wait for the task to finish.
    ///
    /// A read in progress is abandoned.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.lock().await.take() {
            log_task_exit(&self.serial_number, task.await);
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}

/// Returns whether the poll task ended cleanly.
fn log_task_exit(serial: &str, result: Result<(), JoinError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Poller task for {} ended abnormally: {}", serial, e);
            false
        }
    }
}

async fn run(
    client: Arc<HeltyClient>,
    device: Device,
    period: Duration,
    state_tx: watch::Sender<PollState>,
    refresh: Arc<Notify>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let serial = device.serial_number.as_str();
    info!(
        "Starting poller for {} ({}, interval: {}s)",
        serial,
        device.display_name(),
        period.as_secs()
    );

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = refresh.notified() => {
                debug!("Immediate refresh requested for {}", serial);
                ticker.reset();
            }
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
                continue;
            }
        }

        let outcome = tokio::select! {
            outcome = poll_device(&client, &device) => outcome,
            _ = stop_rx.changed() => break,
        };

        match outcome {
            Ok(reading) => {
                let recovered = state_tx.borrow().consecutive_failures > LOUD_FAILURES;
                if recovered {
                    info!("Poller for {} recovered", serial);
                }
                debug!("Read {} sensor values from {}", reading.len(), serial);
                state_tx.send_modify(|state| state.record_success(reading));
            }
            Err(e) => {
                state_tx.send_modify(|state| state.record_failure(&e));
                let failures = state_tx.borrow().consecutive_failures;
                if failures <= LOUD_FAILURES {
                    warn!("Failed to poll {}: {} (attempt {})", serial, e, failures);
                } else if failures == LOUD_FAILURES + 1 {
                    error!(
                        "Failed to poll {} after {} attempts, will continue trying silently",
                        serial, failures
                    );
                }
            }
        }
    }

    info!("Poller for {} stopped", serial);
}

async fn poll_device(client: &HeltyClient, device: &Device) -> Result<SensorReading, PollError> {
    let reading = client
        .read_sensors(&device.board_serial_number, &device.serial_number)
        .await?;
    if reading.is_empty() {
        return Err(PollError::EmptyReading);
    }
    Ok(reading)
}
