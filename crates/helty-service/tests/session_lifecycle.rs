//! End-to-end session lifecycle against the in-memory cloud mocks.

use std::sync::Arc;
use std::time::Duration;

use helty_core::mock::{MockIdentityProvider, MockReply, MockTransport};
use helty_core::{Credentials, HeltyClient, LAST_STATUS_PATH, PRODUCT_SEARCH_PATH};
use helty_service::{Config, SessionRegistry};
use helty_types::{Preset, ToggleKind, VmcStatus};
use serde_json::json;

fn mock_cloud() -> (Arc<MockIdentityProvider>, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    transport.on(
        PRODUCT_SEARCH_PATH,
        MockReply::json(
            200,
            &json!({ "data": [{
                "_id": "p1",
                "serialNumber": "SN1",
                "boardSerialNumber": "B1",
                "productType": { "model": "Flow Elite" },
                "clientInfo": { "mail": "ada@example.com" }
            }]}),
        ),
    );
    transport.on("/sendcommand/B1", MockReply::empty());
    transport.on(
        LAST_STATUS_PATH,
        MockReply::json(
            200,
            &json!([
                { "field": "TemperaturaInterna", "value": 215 },
                { "field": "VMCStatus", "value": 3 }
            ]),
        ),
    );
    (Arc::new(MockIdentityProvider::new()), transport)
}

#[tokio::test(start_paused = true)]
async fn test_config_file_to_polled_reading_and_teardown() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.toml");
    std::fs::write(&path, "[poller]\ninterval_secs = 120\n").unwrap();
    let config = Config::load_validated(&path).unwrap();
    assert_eq!(config.poller.interval(), Duration::from_secs(120));

    let (provider, transport) = mock_cloud();
    let client = HeltyClient::with_backends(config.client.clone(), provider, transport.clone());
    let registry = SessionRegistry::new();
    let session = registry
        .open_with_client(
            "home",
            client,
            &Credentials::new("ada@example.com", "pw"),
            config.poller.interval(),
        )
        .await
        .unwrap();

    let device = session.device("SN1").unwrap();
    let mut rx = device.poller().subscribe();
    rx.changed().await.unwrap();
    let state = rx.borrow().clone();
    let reading = state.current().copied().unwrap();
    assert_eq!(reading.temp_indoor, Some(21.5));
    assert_eq!(reading.status(), Some(VmcStatus::Night));

    session.set_preset("SN1", Preset::Hyper).await.unwrap();
    let led = session.set_toggle("SN1", ToggleKind::Led, false).await.unwrap();
    assert_eq!(led.to_string(), "LED: off (assumed)");

    registry.close_all().await;
    assert!(registry.is_empty().await);
    assert!(device.poller().is_stopped());
    assert!(session.client().id_token().await.is_none());
}
