// crates/partner-sync-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic starting point for operators and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example `partner-sync.toml`. Every value shown is the default
//! except the store backend, which selects `SQLite` so history survives
//! restarts.

/// Returns a canonical example `partner-sync.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[broker]
url = "nats://127.0.0.1:4222"
stream = "partner-sync"
max_deliver = 10
ack_wait_ms = 30000
deliver_policy = "new"
max_in_flight = 32

[subjects]
master_registration = "SyncMasterRegistration.Synced"
user_registration = "SyncUserRegistration.Synced"
user_course = "SyncUserCourse.Synced"
student_package = "SyncJprepStudentPackage.Synced"

[subjects.durables]
# "sync-staff" = "durable-sync-staff"

[sync]
chunk_size = 500
staleness_window_minutes = 60
handler_timeout_ms = 30000
recover_max_retry = 3
report_max_range_days = 30

[sync.publish_retry]
max_attempts = 3
initial_backoff_ms = 100
max_backoff_ms = 2000

[store]
type = "sqlite"
path = "partner-sync.db"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[telemetry]
sink = "stderr"

[class_courses]
# "10" = ["course-1", "course-2"]
"#,
    )
}
