//! Integration tests for the `autofeed` CLI binary.
//!
//! Static checks run without any service; the rest point the binary at a
//! wiremock server. Every test gets its own config and settings files.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `autofeed` binary with env isolation.
///
/// Clears all `AUTOFEED_*` env vars and points config and settings at
/// files inside `dir` so tests never touch the user's real configuration.
fn autofeed_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("autofeed");
    cmd.env("HOME", "/tmp/autofeed-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/autofeed-cli-test-nonexistent")
        .env("XDG_DATA_HOME", "/tmp/autofeed-cli-test-nonexistent")
        .env("NO_COLOR", "1")
        .env_remove("AUTOFEED_SERVICE_URL")
        .env_remove("AUTOFEED_TIMEOUT")
        .env_remove("AUTOFEED_CONFIG_FILE")
        .env_remove("AUTOFEED_SETTINGS_FILE")
        .env_remove("AUTOFEED_OUTPUT")
        .env_remove("AUTOFEED_INSECURE")
        .env_remove("AUTOFEED_SERVICE__URL")
        .env_remove("AUTOFEED_DEVICE__POLL_INTERVAL_MS")
        .arg("--config-file")
        .arg(dir.join("config.toml"))
        .arg("--settings-file")
        .arg(dir.join("settings.toml"));
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

fn configure_device(dir: &Path, device_id: &str) {
    autofeed_cmd(dir)
        .args(["config", "set", "device_id", device_id])
        .assert()
        .success();
}

/// Run the binary off the async runtime so wiremock keeps serving.
async fn run_blocking(
    dir: &Path,
    server: &MockServer,
    args: &'static [&'static str],
) -> std::process::Output {
    let mut cmd = autofeed_cmd(dir);
    cmd.arg("--service-url").arg(server.uri()).args(args);
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = TempDir::new().unwrap();
    let output = autofeed_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let dir = TempDir::new().unwrap();
    autofeed_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("pet feeder")
            .and(predicate::str::contains("feed"))
            .and(predicate::str::contains("schedules"))
            .and(predicate::str::contains("refill")),
    );
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    autofeed_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("autofeed"));
}

#[test]
fn test_completions_bash_and_zsh() {
    let dir = TempDir::new().unwrap();
    for shell in ["bash", "zsh"] {
        autofeed_cmd(dir.path())
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::is_empty().not());
    }
}

#[test]
fn test_zero_amount_rejected_by_parser() {
    let dir = TempDir::new().unwrap();
    let output = autofeed_cmd(dir.path()).args(["feed", "0"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

// ── Local validation (no service needed) ────────────────────────────

#[test]
fn test_feed_without_device_is_config_error() {
    let dir = TempDir::new().unwrap();
    let output = autofeed_cmd(dir.path()).args(["feed", "50"]).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    let text = combined_output(&output);
    assert!(text.contains("No device configured"), "{text}");
    assert!(text.contains("config set device_id"), "{text}");
}

#[test]
fn test_invalid_schedule_time_is_usage_error() {
    let dir = TempDir::new().unwrap();
    configure_device(dir.path(), "Feeder_01");
    let output = autofeed_cmd(dir.path())
        .args(["schedules", "add", "25:00", "50"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_remove_schedule_needs_yes_without_terminal() {
    let dir = TempDir::new().unwrap();
    let output = autofeed_cmd(dir.path())
        .args(["schedules", "remove", "abc"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

// ── Config & settings ───────────────────────────────────────────────

#[test]
fn test_config_set_device_and_show() {
    let dir = TempDir::new().unwrap();
    configure_device(dir.path(), "  Feeder_01 ");
    autofeed_cmd(dir.path())
        .args(["config", "set", "camera_ip", "192.168.1.40"])
        .assert()
        .success();

    let output = autofeed_cmd(dir.path())
        .args(["-o", "json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["settings"]["device_id"], "Feeder_01");
    assert_eq!(shown["settings"]["camera_ip"], "192.168.1.40");
    assert_eq!(shown["service"]["url"], "http://127.0.0.1:8001");
}

#[test]
fn test_config_set_blank_device_rejected() {
    let dir = TempDir::new().unwrap();
    let output = autofeed_cmd(dir.path())
        .args(["config", "set", "device_id", "   "])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Device ID cannot be empty"));
}

#[test]
fn test_config_set_service_keys() {
    let dir = TempDir::new().unwrap();
    autofeed_cmd(dir.path())
        .args(["config", "set", "device.low_food_threshold", "150"])
        .assert()
        .success();
    let saved = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(saved.contains("low_food_threshold = 150"), "{saved}");

    let bad_url = autofeed_cmd(dir.path())
        .args(["config", "set", "service.url", "not a url"])
        .output()
        .unwrap();
    assert_eq!(bad_url.status.code(), Some(2));

    let unknown = autofeed_cmd(dir.path())
        .args(["config", "set", "service.colour", "red"])
        .output()
        .unwrap();
    assert_eq!(unknown.status.code(), Some(2));
}

#[test]
fn test_config_defaults_select_output_format() {
    let dir = TempDir::new().unwrap();
    autofeed_cmd(dir.path())
        .args(["config", "set", "defaults.output", "json"])
        .assert()
        .success();
    let output = autofeed_cmd(dir.path())
        .args(["config", "path"])
        .output()
        .unwrap();
    let paths: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(paths["settings"].as_str().unwrap().ends_with("settings.toml"));
}

// ── Against a live (mock) service ───────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_status_reports_low_food() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/device/Feeder_01/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "weight": 12.4,
            "container_weight": 80,
            "online": true,
            "status": "Idle"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    configure_device(dir.path(), "Feeder_01");
    let output = run_blocking(dir.path(), &server, &["-o", "json", "status"]).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["state"]["bowl_weight_grams"], 12);
    assert_eq!(status["state"]["container_weight_grams"], 80);
    assert_eq!(status["state"]["online"], true);
    assert_eq!(status["low_food_alert_fired"], true);
    assert_eq!(status["display"]["text"], "Idle");
    assert!(status["camera_stream_url"].is_null());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_feed_posts_grams() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/feed"))
        .and(body_json(json!({ "device_id": "Feeder_01", "amount": 50, "unit": "g" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Feed command sent" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    configure_device(dir.path(), "Feeder_01");
    let output = run_blocking(dir.path(), &server, &["feed", "50"]).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Feeding 50g requested"), "{stderr}");
    assert!(stderr.contains("Feed command sent"), "{stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_water_service_error_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/water"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "detail": "Device offline" })))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    configure_device(dir.path(), "Feeder_01");
    let output = run_blocking(dir.path(), &server, &["water", "200"]).await;

    assert_eq!(output.status.code(), Some(9));
    assert!(combined_output(&output).contains("Device offline"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_schedules_list_plain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "s2", "device_id": "Feeder_01", "time": "18:00", "amount": 40, "unit": "g" },
            { "id": "s1", "device_id": "Feeder_01", "time": "07:30", "amount": 50, "unit": "g" }
        ])))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let output = run_blocking(dir.path(), &server, &["-o", "plain", "schedules", "list"]).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "s1\ns2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_service_exit_code() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);

    let dir = TempDir::new().unwrap();
    configure_device(dir.path(), "Feeder_01");
    let mut cmd = autofeed_cmd(dir.path());
    cmd.args(["--service-url", uri.as_str(), "--timeout", "2", "status"]);
    let output = tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(7), "{}", combined_output(&output));
}
