// crates/partner-sync-core/src/runtime/service.rs
// ============================================================================
// Module: Sync Log Service
// Description: Status updates, signature lookups, and staleness checks.
// Purpose: Wrap the sync log store with the rules handlers rely on.
// Dependencies: thiserror, crate::interfaces
// ============================================================================

//! ## Overview
//! [`SyncLogService`] is the only path handlers use to touch the sync log.
//! Invariants:
//! - An empty split id makes [`SyncLogService::update_status`] a no-op.
//! - Unknown status labels are rejected before reaching the store.
//! - A staleness check refreshes `updated_at` only for fresh batches.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::InvalidStatusError;
use crate::core::Signature;
use crate::core::SplitId;
use crate::core::SyncLog;
use crate::core::SyncLogSplit;
use crate::core::SyncStatus;
use crate::interfaces::Clock;
use crate::interfaces::StoreError;
use crate::interfaces::SyncLogStore;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Sync log service errors.
#[derive(Debug, Error)]
pub enum SyncLogError {
    /// Signature was empty.
    #[error("signature is empty")]
    EmptySignature,
    /// No sync log exists for the signature.
    #[error("sync log not found for signature {0}")]
    NotFound(String),
    /// Status label is not a known status.
    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatusError),
    /// Store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Staleness
// ============================================================================

/// Result of a staleness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Staleness {
    /// Log was seen within the window; `updated_at` was refreshed.
    Fresh,
    /// Log was last seen longer ago than the window.
    Stale {
        /// Age of the log at check time.
        age: Duration,
    },
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Sync log operations used by handlers and operational tooling.
#[derive(Clone)]
pub struct SyncLogService {
    /// Backing store.
    store: Arc<dyn SyncLogStore>,
    /// Time source.
    clock: Arc<dyn Clock>,
}

impl SyncLogService {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn SyncLogStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
        }
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SyncLogStore> {
        &self.store
    }

    /// Returns the time source.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Moves the split to `status`. Returns `None` for an empty split id.
    ///
    /// # Errors
    ///
    /// Returns [`SyncLogError::Store`] when the split is unknown, the
    /// transition is not allowed, or the store fails.
    pub async fn update_status(
        &self,
        split_id: &SplitId,
        status: SyncStatus,
    ) -> Result<Option<SyncLogSplit>, SyncLogError> {
        if split_id.is_empty() {
            return Ok(None);
        }
        let split = self.store.update_split_status(split_id, status, self.clock.now()).await?;
        Ok(Some(split))
    }

    /// Moves the split to the status named by `label`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncLogError::InvalidStatus`] for unknown labels, otherwise
    /// as [`SyncLogService::update_status`].
    pub async fn update_status_label(
        &self,
        split_id: &SplitId,
        label: &str,
    ) -> Result<Option<SyncLogSplit>, SyncLogError> {
        if split_id.is_empty() {
            return Ok(None);
        }
        let status: SyncStatus = label.parse()?;
        self.update_status(split_id, status).await
    }

    /// Returns the sync log for `signature`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncLogError::EmptySignature`] or [`SyncLogError::NotFound`].
    pub async fn get_by_signature(&self, signature: &Signature) -> Result<SyncLog, SyncLogError> {
        if signature.is_empty() {
            return Err(SyncLogError::EmptySignature);
        }
        self.store
            .get_log_by_signature(signature)
            .await?
            .ok_or_else(|| SyncLogError::NotFound(signature.to_string()))
    }

    /// Checks whether the log for `signature` is older than `window`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncLogError`] when the log cannot be loaded or refreshed.
    pub async fn check_staleness(
        &self,
        signature: &Signature,
        window: Duration,
    ) -> Result<Staleness, SyncLogError> {
        let log = self.get_by_signature(signature).await?;
        let now = self.clock.now();
        let age = log.updated_at.age_at(now);
        if age > window {
            return Ok(Staleness::Stale {
                age,
            });
        }
        self.store.touch_log(&log.log_id, now).await?;
        Ok(Staleness::Fresh)
    }

    /// Lists every split of the log with `signature`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncLogError::EmptySignature`] or a store error.
    pub async fn splits_by_signature(
        &self,
        signature: &Signature,
    ) -> Result<Vec<SyncLogSplit>, SyncLogError> {
        if signature.is_empty() {
            return Err(SyncLogError::EmptySignature);
        }
        Ok(self.store.splits_by_signature(signature).await?)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::Staleness;
    use super::SyncLogError;
    use super::SyncLogService;
    use crate::core::NewSyncLog;
    use crate::core::NewSyncLogSplit;
    use crate::core::Signature;
    use crate::core::SplitId;
    use crate::core::SyncKind;
    use crate::core::SyncStatus;
    use crate::core::Timestamp;
    use crate::interfaces::Clock;
    use crate::interfaces::StoreError;
    use crate::interfaces::SyncLogStore;
    use crate::runtime::InMemorySyncLogStore;
    use crate::runtime::ManualClock;

    fn service() -> (SyncLogService, InMemorySyncLogStore, ManualClock) {
        let store = InMemorySyncLogStore::new();
        let clock = ManualClock::new(Timestamp::from_unix_millis(1_700_000_000_000));
        (SyncLogService::new(Arc::new(store.clone()), Arc::new(clock.clone())), store, clock)
    }

    #[tokio::test]
    async fn empty_split_id_is_a_no_op() {
        let (service, _, _) = service();
        let result = service.update_status(&SplitId::default(), SyncStatus::Processing).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn unknown_status_label_is_rejected() {
        let (service, _, _) = service();
        let result = service.update_status_label(&SplitId::new("split"), "done").await;
        assert!(matches!(result, Err(SyncLogError::InvalidStatus(_))));
    }

    #[tokio::test]
    async fn unknown_split_is_not_found() {
        let (service, _, _) = service();
        let result = service.update_status(&SplitId::new("missing"), SyncStatus::Processing).await;
        assert!(matches!(result, Err(SyncLogError::Store(StoreError::NotFound(_)))));
    }

    #[tokio::test]
    async fn empty_or_unknown_signature_is_an_error() {
        let (service, _, _) = service();
        assert!(matches!(
            service.get_by_signature(&Signature::new("")).await,
            Err(SyncLogError::EmptySignature)
        ));
        assert!(matches!(
            service.get_by_signature(&Signature::new("nope")).await,
            Err(SyncLogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn pending_split_cannot_jump_to_success() {
        let (service, store, clock) = service();
        let log = store
            .create_log(
                NewSyncLog {
                    signature: Signature::new("sig"),
                    payload: String::new(),
                },
                clock.now(),
            )
            .await
            .unwrap();
        let split = store
            .create_split(
                NewSyncLogSplit {
                    log_id: log.log_id,
                    kind: SyncKind::Course,
                    payload: "[]".to_string(),
                },
                clock.now(),
            )
            .await
            .unwrap();
        let result = service.update_status(&split.split_id, SyncStatus::Success).await;
        assert!(matches!(result, Err(SyncLogError::Store(StoreError::InvalidTransition { .. }))));
        service.update_status(&split.split_id, SyncStatus::Processing).await.unwrap();
        let done = service.update_status(&split.split_id, SyncStatus::Success).await.unwrap();
        assert_eq!(done.map(|split| split.status), Some(SyncStatus::Success));
    }

    #[tokio::test]
    async fn stale_check_leaves_updated_at_untouched() {
        let (service, store, clock) = service();
        let signature = Signature::new("sig");
        let created = store
            .create_log(
                NewSyncLog {
                    signature: signature.clone(),
                    payload: String::new(),
                },
                clock.now(),
            )
            .await
            .unwrap();
        clock.advance(Duration::from_secs(61 * 60));
        let staleness =
            service.check_staleness(&signature, Duration::from_secs(3600)).await.unwrap();
        assert!(matches!(staleness, Staleness::Stale { .. }));
        let log = service.get_by_signature(&signature).await.unwrap();
        assert_eq!(log.updated_at, created.updated_at);
    }

    #[tokio::test]
    async fn fresh_check_refreshes_updated_at() {
        let (service, store, clock) = service();
        let signature = Signature::new("sig");
        store
            .create_log(
                NewSyncLog {
                    signature: signature.clone(),
                    payload: String::new(),
                },
                clock.now(),
            )
            .await
            .unwrap();
        clock.advance(Duration::from_secs(59 * 60));
        let staleness =
            service.check_staleness(&signature, Duration::from_secs(3600)).await.unwrap();
        assert_eq!(staleness, Staleness::Fresh);
        let log = service.get_by_signature(&signature).await.unwrap();
        assert_eq!(log.updated_at, clock.now());
    }
}
