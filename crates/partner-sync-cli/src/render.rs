// crates/partner-sync-cli/src/render.rs
// ============================================================================
// Module: Output Views
// Description: Serializable views for the logs, report, and recover commands.
// Purpose: Keep command output stable and free of stored chunk payloads.
// Dependencies: partner-sync-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Each query command prints one JSON document. Views carry labels rather
//! than internal enums so the output shape does not shift with the model.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use partner_sync_core::RecoveryReport;
use partner_sync_core::StatusCounts;
use partner_sync_core::SyncLog;
use partner_sync_core::SyncLogSplit;
use serde::Serialize;

// ============================================================================
// SECTION: Views
// ============================================================================

/// Sync log and its splits, as printed by `logs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogView {
    /// Log identifier.
    pub log_id: String,
    /// Partner signature.
    pub signature: String,
    /// Creation time in unix milliseconds.
    pub created_at: i64,
    /// Last update in unix milliseconds.
    pub updated_at: i64,
    /// Splits, oldest first.
    pub splits: Vec<SplitView>,
}

/// One split row without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitView {
    /// Split identifier.
    pub split_id: String,
    /// Kind label.
    pub kind: &'static str,
    /// Status label.
    pub status: &'static str,
    /// Recovery attempts so far.
    pub retry_times: u32,
    /// Last update in unix milliseconds.
    pub updated_at: i64,
}

impl LogView {
    /// Builds the view for `log` and its `splits`.
    #[must_use]
    pub fn new(log: &SyncLog, splits: &[SyncLogSplit]) -> Self {
        Self {
            log_id: log.log_id.as_str().to_string(),
            signature: log.signature.as_str().to_string(),
            created_at: log.created_at.as_unix_millis(),
            updated_at: log.updated_at.as_unix_millis(),
            splits: splits
                .iter()
                .map(|split| SplitView {
                    split_id: split.split_id.as_str().to_string(),
                    kind: split.kind.as_str(),
                    status: split.status.as_str(),
                    retry_times: split.retry_times,
                    updated_at: split.updated_at.as_unix_millis(),
                })
                .collect(),
        }
    }
}

/// Outcome of `recover`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryView {
    /// Splits republished.
    pub republished: Vec<String>,
    /// Splits marked failed with no retry budget left.
    pub abandoned: Vec<String>,
    /// Processing splits left for broker redelivery.
    pub in_flight: Vec<String>,
    /// Splits whose republish failed.
    pub errors: BTreeMap<String, String>,
}

impl From<RecoveryReport> for RecoveryView {
    fn from(report: RecoveryReport) -> Self {
        Self {
            republished: report.republished.iter().map(|id| id.as_str().to_string()).collect(),
            abandoned: report.abandoned.iter().map(|id| id.as_str().to_string()).collect(),
            in_flight: report.in_flight.iter().map(|id| id.as_str().to_string()).collect(),
            errors: report
                .errors
                .into_iter()
                .map(|(id, message)| (id.as_str().to_string(), message))
                .collect(),
        }
    }
}

// ============================================================================
// SECTION: Rendering
// ============================================================================

/// Renders `value` as pretty JSON.
///
/// # Errors
///
/// Returns the serializer message when `value` cannot be encoded.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| err.to_string())
}

/// Renders a day report as pretty JSON.
///
/// # Errors
///
/// Returns the serializer message when the report cannot be encoded.
pub fn report_json(report: &BTreeMap<String, StatusCounts>) -> Result<String, String> {
    to_json(report)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
