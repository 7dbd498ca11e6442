// crates/partner-sync-core/src/core/sync_log.rs
// ============================================================================
// Module: Partner Sync Log Rows
// Description: Sync log and per-kind split records.
// Purpose: Model the durable status-tracking log owned by the engine.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`SyncLog`] is one inbound partner batch keyed by its unique signature.
//! Each log fans out into [`SyncLogSplit`] rows, one per producer chunk of one
//! kind, whose status the consumers drive.
//! Invariants:
//! - Creating a log for an existing signature returns the existing row.
//! - `updated_at` on the log is the authoritative last-seen time.
//! - Rows are never deleted by the engine.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::Signature;
use crate::core::identifiers::SplitId;
use crate::core::identifiers::SyncLogId;
use crate::core::kind::SyncKind;
use crate::core::status::SyncStatus;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Rows
// ============================================================================

/// One inbound partner batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLog {
    /// Log identifier.
    pub log_id: SyncLogId,
    /// Unique partner signature.
    pub signature: Signature,
    /// Opaque raw payload kept for audit.
    pub payload: String,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last seen or processed time.
    pub updated_at: Timestamp,
}

/// One tracked unit of work for a single kind within a sync log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLogSplit {
    /// Split identifier (the envelope `log_id`).
    pub split_id: SplitId,
    /// Owning sync log.
    pub log_id: SyncLogId,
    /// Split kind.
    pub kind: SyncKind,
    /// Current status.
    pub status: SyncStatus,
    /// Number of retries recorded for this split.
    pub retry_times: u32,
    /// JSON of the chunk records, used for recovery.
    pub payload: String,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last status change.
    pub updated_at: Timestamp,
}

/// Insert request for a sync log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSyncLog {
    /// Unique partner signature.
    pub signature: Signature,
    /// Opaque raw payload kept for audit.
    pub payload: String,
}

/// Insert request for a split; starts in [`SyncStatus::Pending`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSyncLogSplit {
    /// Owning sync log.
    pub log_id: SyncLogId,
    /// Split kind.
    pub kind: SyncKind,
    /// JSON of the chunk records.
    pub payload: String,
}

// ============================================================================
// SECTION: Report Counts
// ============================================================================

/// Split counts per status for one reporting bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Splits in `pending`.
    pub pending: u64,
    /// Splits in `processing`.
    pub processing: u64,
    /// Splits in `success`.
    pub success: u64,
    /// Splits in `failed`.
    pub failed: u64,
}

impl StatusCounts {
    /// Adds `count` splits to the bucket for `status`.
    pub const fn add(&mut self, status: SyncStatus, count: u64) {
        let slot = match status {
            SyncStatus::Pending => &mut self.pending,
            SyncStatus::Processing => &mut self.processing,
            SyncStatus::Success => &mut self.success,
            SyncStatus::Failed => &mut self.failed,
        };
        *slot = slot.saturating_add(count);
    }

    /// Returns the count for `status`.
    #[must_use]
    pub const fn get(&self, status: SyncStatus) -> u64 {
        match status {
            SyncStatus::Pending => self.pending,
            SyncStatus::Processing => self.processing,
            SyncStatus::Success => self.success,
            SyncStatus::Failed => self.failed,
        }
    }
}
