// crates/partner-sync-core/src/core/telemetry.rs
// ============================================================================
// Module: Partner Sync Telemetry Events
// Description: Structured events emitted for every handled batch.
// Purpose: Record signature, kind, and timing without leaking record payloads.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Events are emitted through [`crate::interfaces::SyncTelemetry`]. They carry
//! identifiers and counts only; record payloads are never included.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

// ============================================================================
// SECTION: Batch Events
// ============================================================================

/// Outcome classification for a handled batch.
///
/// # Invariants
/// - Variants are stable for telemetry labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    /// Every chunk was applied.
    Applied,
    /// Skipped as a stale redelivery.
    SkippedStale,
    /// Envelope carried no records for the handler.
    SkippedEmpty,
    /// Failed; the broker should redeliver.
    Redeliver,
    /// Failed permanently; the broker must not redeliver.
    Terminated,
}

impl BatchOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::SkippedStale => "skipped_stale",
            Self::SkippedEmpty => "skipped_empty",
            Self::Redeliver => "redeliver",
            Self::Terminated => "terminated",
        }
    }
}

/// Event emitted once per handled delivery.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Handler label.
    pub handler: &'static str,
    /// Partner signature when the envelope decoded.
    pub signature: Option<String>,
    /// Split identifier when the envelope decoded.
    pub log_id: Option<String>,
    /// Number of records for the handler.
    pub record_count: usize,
    /// Number of chunks applied.
    pub chunk_count: usize,
    /// Batch outcome.
    pub outcome: BatchOutcome,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Error message when the batch failed.
    pub error: Option<String>,
    /// Wall time spent in the handler.
    pub elapsed_ms: u64,
}

/// Process-level engine event (bindings, worker lifecycle, transport errors).
#[derive(Debug, Clone, Serialize)]
pub struct EngineEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Handler label when the event concerns one subscription.
    pub handler: Option<&'static str>,
    /// Human readable detail.
    pub message: String,
}
