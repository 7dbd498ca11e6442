// crates/partner-sync-core/src/interfaces/mod.rs
// ============================================================================
// Module: Partner Sync Interfaces
// Description: Backend-agnostic seams for storage, appliers, and transports.
// Purpose: Define the collaborator contracts injected into the sync engine.
// Dependencies: async-trait, thiserror, crate::core
// ============================================================================

//! ## Overview
//! Every collaborator of the engine is an explicit trait constructed once and
//! injected at startup: the sync log store, the per-kind domain appliers, the
//! class-to-course resolver, the derived-event publisher, telemetry, and the
//! clock. No backend error type crosses these boundaries.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::BatchEvent;
use crate::core::EngineEvent;
use crate::core::NewSyncLog;
use crate::core::NewSyncLogSplit;
use crate::core::Signature;
use crate::core::SplitId;
use crate::core::SyncLog;
use crate::core::SyncLogId;
use crate::core::SyncLogSplit;
use crate::core::SyncStatus;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Sync Log Store
// ============================================================================

/// Sync log store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("sync log store io error: {0}")]
    Io(String),
    /// Referenced row does not exist.
    #[error("sync log store row not found: {0}")]
    NotFound(String),
    /// Split status transition is not allowed.
    #[error("sync log split {split_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Split identifier.
        split_id: String,
        /// Current status.
        from: SyncStatus,
        /// Requested status.
        to: SyncStatus,
    },
    /// Stored data is invalid.
    #[error("sync log store invalid data: {0}")]
    Invalid(String),
    /// Store data version is incompatible.
    #[error("sync log store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store reported an error.
    #[error("sync log store error: {0}")]
    Store(String),
}

/// Durable storage for sync logs and their splits.
///
/// All writes are single-row and keyed; implementations need no cross-row
/// transactions.
#[async_trait]
pub trait SyncLogStore: Send + Sync {
    /// Creates a sync log, or returns the existing row for the signature.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    async fn create_log(&self, log: NewSyncLog, now: Timestamp) -> Result<SyncLog, StoreError>;

    /// Creates a split in [`SyncStatus::Pending`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the owning log does not exist.
    async fn create_split(
        &self,
        split: NewSyncLogSplit,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError>;

    /// Loads a split by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    async fn get_split(&self, split_id: &SplitId) -> Result<Option<SyncLogSplit>, StoreError>;

    /// Moves a split to `status`; `retry_times` is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown splits and
    /// [`StoreError::InvalidTransition`] for disallowed transitions.
    async fn update_split_status(
        &self,
        split_id: &SplitId,
        status: SyncStatus,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError>;

    /// Marks a split failed regardless of its current status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown splits.
    async fn abandon_split(
        &self,
        split_id: &SplitId,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError>;

    /// Increments `retry_times` for a split queued for republishing.
    ///
    /// This is the only operation that counts retries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown splits.
    async fn increment_retry(
        &self,
        split_id: &SplitId,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError>;

    /// Loads a sync log by signature.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    async fn get_log_by_signature(
        &self,
        signature: &Signature,
    ) -> Result<Option<SyncLog>, StoreError>;

    /// Loads a sync log by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    async fn get_log(&self, log_id: &SyncLogId) -> Result<Option<SyncLog>, StoreError>;

    /// Refreshes a sync log's `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown logs.
    async fn touch_log(&self, log_id: &SyncLogId, now: Timestamp) -> Result<(), StoreError>;

    /// Lists the splits owned by the log with `signature`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    async fn splits_by_signature(
        &self,
        signature: &Signature,
    ) -> Result<Vec<SyncLogSplit>, StoreError>;

    /// Lists splits created in `[from, to)`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    async fn splits_created_between(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<SyncLogSplit>, StoreError>;

    /// Checks store readiness.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    async fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Domain Appliers
// ============================================================================

/// Domain applier errors.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// Applier rejected or failed the chunk.
    #[error("apply failed: {0}")]
    Failed(String),
}

/// Applies one chunk of records of a single kind to the domain stores.
///
/// Appliers must be idempotent: a redelivered batch is reapplied in full.
#[async_trait]
pub trait SyncApplier<R>: Send + Sync
where
    R: Send + Sync,
{
    /// Applies `records` in order.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] when the chunk cannot be applied.
    async fn apply(&self, records: &[R]) -> Result<(), ApplyError>;
}

// ============================================================================
// SECTION: Class Resolution
// ============================================================================

/// Class resolution errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Lookup backend failed.
    #[error("class resolution failed: {0}")]
    Lookup(String),
}

/// Resolves partner class ids to the current course ids of each class.
#[async_trait]
pub trait ClassCourseResolver: Send + Sync {
    /// Returns course ids keyed by class id; absent keys are unknown classes.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the lookup fails.
    async fn course_ids_by_class(
        &self,
        class_ids: &[i64],
    ) -> Result<BTreeMap<i64, Vec<String>>, ResolveError>;
}

// ============================================================================
// SECTION: Event Publishing
// ============================================================================

/// Event publishing errors.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Broker rejected or failed the publish.
    #[error("publish to {subject} failed: {message}")]
    Broker {
        /// Target subject.
        subject: String,
        /// Failure detail.
        message: String,
    },
    /// Publisher is not connected.
    #[error("publisher unavailable: {0}")]
    Unavailable(String),
}

/// Publishes payloads onto broker subjects.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes `payload` on `subject` and waits for the broker acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] when the broker does not accept the message.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), PublishError>;
}

// ============================================================================
// SECTION: Telemetry
// ============================================================================

/// Sink for structured engine telemetry.
pub trait SyncTelemetry: Send + Sync {
    /// Records a handled batch.
    fn record_batch(&self, event: &BatchEvent);

    /// Records a process-level engine event.
    fn record_engine(&self, _event: &EngineEvent) {}
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}
