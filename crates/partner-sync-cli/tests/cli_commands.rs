// crates/partner-sync-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests that run the partner-sync binary.
// Purpose: Ensure config, logs, report, and recover commands behave and fail
//          closed without a broker.
// Dependencies: partner-sync-cli binary, partner-sync-store-sqlite, tempfile
// ============================================================================

//! ## Overview
//! Seeds a `SQLite` sync log in a temp directory, then runs the CLI binary
//! against it. None of these commands need a running NATS server.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use partner_sync_core::NewSyncLog;
use partner_sync_core::NewSyncLogSplit;
use partner_sync_core::Signature;
use partner_sync_core::SyncKind;
use partner_sync_core::SyncLogStore;
use partner_sync_core::SyncStatus;
use partner_sync_core::Timestamp;
use partner_sync_store_sqlite::SqliteStoreConfig;
use partner_sync_store_sqlite::SqliteSyncLogStore;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// 2024-03-05T00:00:00Z.
const MARCH_5: i64 = 1_709_596_800_000;

fn partner_sync_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_partner-sync"))
}

fn run(args: &[&str]) -> Output {
    Command::new(partner_sync_bin())
        .env_remove("PARTNER_SYNC_CONFIG")
        .args(args)
        .output()
        .expect("run partner-sync")
}

fn write_sqlite_config(dir: &TempDir) -> PathBuf {
    let config_path = dir.path().join("partner-sync.toml");
    let db_path = dir.path().join("sync.db");
    let config = format!(
        "[store]\ntype = \"sqlite\"\npath = \"{}\"\n\n[telemetry]\nsink = \"none\"\n",
        db_path.display()
    );
    fs::write(&config_path, config).expect("write config");
    config_path
}

async fn seed_store(dir: &TempDir) {
    let store = SqliteSyncLogStore::new(SqliteStoreConfig::for_path(dir.path().join("sync.db")))
        .expect("open store");
    let now = Timestamp::from_unix_millis(MARCH_5 + 60_000);
    let log = store
        .create_log(
            NewSyncLog {
                signature: Signature::new("sig-march"),
                payload: "{}".to_string(),
            },
            now,
        )
        .await
        .unwrap();
    for kind in [SyncKind::Course, SyncKind::Staff] {
        store
            .create_split(
                NewSyncLogSplit {
                    log_id: log.log_id.clone(),
                    kind,
                    payload: "[]".to_string(),
                },
                now,
            )
            .await
            .unwrap();
    }
    let splits = store.splits_by_signature(&Signature::new("sig-march")).await.unwrap();
    store.update_split_status(&splits[0].split_id, SyncStatus::Processing, now).await.unwrap();
    store.update_split_status(&splits[0].split_id, SyncStatus::Success, now).await.unwrap();
}

fn config_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("stdout is json")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn config_check_accepts_valid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_sqlite_config(&dir);
    let output = run(&["config", "check", "--config", &config_arg(&config_path)]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("config ok: 10 subscriptions, store sqlite"), "stdout: {stdout}");
}

#[test]
fn config_check_fails_closed_on_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("partner-sync.toml");
    fs::write(&config_path, "[broker]\nmax_deliver = 0\n").unwrap();
    let output = run(&["config", "check", "--config", &config_arg(&config_path)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broker.max_deliver"), "stderr: {stderr}");
}

#[test]
fn config_path_can_come_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_sqlite_config(&dir);
    let output = Command::new(partner_sync_bin())
        .env("PARTNER_SYNC_CONFIG", &config_path)
        .args(["config", "check"])
        .output()
        .unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn config_example_is_a_loadable_config() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&["config", "example"]);
    assert!(output.status.success());
    let config_path = dir.path().join("example.toml");
    fs::write(&config_path, &output.stdout).unwrap();
    let check = run(&["config", "check", "--config", &config_arg(&config_path)]);
    assert!(check.status.success(), "stderr: {}", String::from_utf8_lossy(&check.stderr));
}

#[tokio::test]
async fn logs_prints_log_and_splits_for_signature() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_sqlite_config(&dir);
    seed_store(&dir).await;
    let output = run(&["logs", "--signature", "sig-march", "--config", &config_arg(&config_path)]);
    let value = stdout_json(&output);
    assert_eq!(value["signature"], "sig-march");
    let splits = value["splits"].as_array().unwrap();
    assert_eq!(splits.len(), 2);
    assert_eq!(splits[0]["status"], "success");
    assert_eq!(splits[1]["status"], "pending");
    assert_eq!(splits[1]["kind"], "staff");
}

#[tokio::test]
async fn logs_for_unknown_signature_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_sqlite_config(&dir);
    seed_store(&dir).await;
    let output = run(&["logs", "--signature", "sig-other", "--config", &config_arg(&config_path)]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no sync log for signature sig-other"), "stderr: {stderr}");
}

#[tokio::test]
async fn report_counts_splits_per_day_and_status() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_sqlite_config(&dir);
    seed_store(&dir).await;
    let output = run(&[
        "report",
        "--from",
        "2024-03-01",
        "--to",
        "2024-03-10",
        "--config",
        &config_arg(&config_path),
    ]);
    let value = stdout_json(&output);
    let days = value.as_object().unwrap();
    assert_eq!(days.len(), 1);
    let day = &value["2024-03-05"];
    assert_eq!(day["pending"], 1);
    assert_eq!(day["processing"], 0);
    assert_eq!(day["success"], 1);
    assert_eq!(day["failed"], 0);
}

#[test]
fn report_rejects_ranges_wider_than_the_limit() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_sqlite_config(&dir);
    let output = run(&[
        "report",
        "--from",
        "2024-01-01",
        "--to",
        "2024-02-15",
        "--config",
        &config_arg(&config_path),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid date range"), "stderr: {stderr}");
}

#[test]
fn recover_requires_a_durable_store() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("partner-sync.toml");
    fs::write(&config_path, "[telemetry]\nsink = \"none\"\n").unwrap();
    let output = run(&[
        "recover",
        "--from",
        "2024-03-01",
        "--to",
        "2024-03-02",
        "--config",
        &config_arg(&config_path),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("requires [store] type = \"sqlite\""), "stderr: {stderr}");
}
