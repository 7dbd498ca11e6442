// crates/partner-sync-core/src/core/status.rs
// ============================================================================
// Module: Partner Sync Split Status
// Description: Status lifecycle for sync log splits.
// Purpose: Validate status labels and transitions before they reach storage.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A split moves `Pending -> Processing -> {Success | Failed}` within one
//! attempt. Redelivery re-enters `Processing`; nothing ever returns to
//! `Pending`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Status of a sync log split.
///
/// # Invariants
/// - Labels returned by [`SyncStatus::as_str`] are stable storage values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Created by the producer, not yet picked up.
    Pending,
    /// A handler is applying the batch.
    Processing,
    /// Every chunk was applied.
    Success,
    /// The last attempt failed; the broker may redeliver.
    Failed,
}

/// Unknown status label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid sync status: {0}")]
pub struct InvalidStatusError(pub String);

impl SyncStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Processing, Self::Success, Self::Failed];

    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Returns true when moving from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match next {
            Self::Pending => matches!(self, Self::Pending),
            Self::Processing => true,
            Self::Success => matches!(self, Self::Processing | Self::Success),
            Self::Failed => matches!(self, Self::Processing | Self::Failed),
        }
    }
}

impl FromStr for SyncStatus {
    type Err = InvalidStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| InvalidStatusError(value.to_string()))
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
