//! CLI Integration Tests
//!
//! These tests run the `helty` binary. Offline commands run as-is; commands
//! that need the cloud run against a local fake of the identity provider and
//! the device API.
//!
//! ```
//! cargo test --package helty-cli --test cli_integration
//! ```

use std::process::{Command, Output};

use axum::Router;
use axum::extract::Path;
use axum::routing::post;
use serde_json::{Value, json};

const BINARY: &str = env!("CARGO_BIN_EXE_helty");

/// Run helty with no credentials or device in the environment.
fn run_helty(args: &[&str]) -> Output {
    Command::new(BINARY)
        .args(args)
        .env_remove("HELTY_EMAIL")
        .env_remove("HELTY_PASSWORD")
        .env_remove("HELTY_DEVICE")
        .env("NO_COLOR", "1")
        .output()
        .expect("Failed to run helty binary")
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_command() {
    let output = run_helty(&["--help"]);

    assert!(output.status.success(), "Help should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Helty"), "Help should mention Helty");
    for command in ["devices", "sensors", "send", "commands", "completions"] {
        assert!(stdout.contains(command), "Help should list {}", command);
    }
}

#[test]
fn test_version_command() {
    let output = run_helty(&["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_completions_bash() {
    let output = run_helty(&["completions", "bash"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("helty"));
}

// =============================================================================
// Offline commands
// =============================================================================

#[test]
fn test_commands_text() {
    let output = run_helty(&["commands"]);

    assert!(output.status.success(), "commands needs no credentials");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("speed1"));
    assert!(stdout.contains("night"));
    assert!(stdout.contains("reset-filter"));
}

#[test]
fn test_commands_json() {
    let output = run_helty(&["commands", "--json"]);

    assert!(output.status.success());
    let commands: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    let night = commands
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "night")
        .expect("night in catalogue");
    assert_eq!(night["id"], 22);
    assert_eq!(night["category"], "Mode");
}

#[test]
fn test_devices_without_credentials_fails() {
    let output = run_helty(&["devices"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("HELTY_EMAIL"), "stderr: {}", stderr);
}

#[test]
fn test_send_unknown_command_fails_before_sign_in() {
    let output = run_helty(&["send", "warp"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown command: warp"), "stderr: {}", stderr);
}

// =============================================================================
// Against a fake cloud
// =============================================================================

async fn initiate_auth(body: String) -> String {
    let request: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(request["AuthFlow"], "USER_PASSWORD_AUTH");
    json!({ "AuthenticationResult": { "IdToken": "id", "ExpiresIn": 3600 } }).to_string()
}

async fn product_search() -> axum::Json<Value> {
    axum::Json(json!({ "data": [
        {
            "_id": "p1",
            "serialNumber": "SN1",
            "boardSerialNumber": "B1",
            "productType": { "model": "Flow 100" },
            "clientInfo": { "mail": "ada@example.com" }
        },
        {
            "_id": "p2",
            "serialNumber": "SN2",
            "boardSerialNumber": "B2",
            "productType": { "model": "Flow Elite" },
            "clientInfo": { "mail": "ada@example.com" }
        }
    ]}))
}

async fn send_command(Path(board): Path<String>, axum::Json(body): axum::Json<Value>) -> String {
    json!({ "board": board, "commandId": body["commandId"] }).to_string()
}

async fn spawn_fake_cloud() -> String {
    let app = Router::new()
        .route("/idp", post(initiate_auth))
        .route("/board/product/search", post(product_search))
        .route("/board/board/sendcommand/{board}", post(send_command));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn run_against(base: &str, args: &[&str]) -> Output {
    tokio::process::Command::new(BINARY)
        .args(args)
        .env("HELTY_EMAIL", "ada@example.com")
        .env("HELTY_PASSWORD", "pw")
        .env("HELTY_API_URL", base)
        .env("HELTY_IDENTITY_URL", format!("{}/idp", base))
        .env_remove("HELTY_DEVICE")
        .env("NO_COLOR", "1")
        .output()
        .await
        .expect("Failed to run helty binary")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_devices_json_against_fake_cloud() {
    let base = spawn_fake_cloud().await;

    let output = run_against(&base, &["devices", "--json"]).await;

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["count"], 2);
    assert_eq!(value["devices"][1]["model"], "Flow Elite");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_targets_selected_board() {
    let base = spawn_fake_cloud().await;

    let output = run_against(&base, &["send", "night", "--device", "SN2", "--json"]).await;

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(value["serial_number"], "SN2");
    assert_eq!(value["command"], "night");
    assert_eq!(value["response"], json!({ "board": "B2", "commandId": 22 }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_send_raw_id_defaults_to_first_device() {
    let base = spawn_fake_cloud().await;

    let output = run_against(&base, &["send", "123"]).await;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Sent #123 to Helty Flow 100"), "stdout: {}", stdout);
}
