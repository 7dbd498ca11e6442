// crates/partner-sync-core/src/runtime/store.rs
// ============================================================================
// Module: In-Memory Sync Log Store
// Description: Mutex-guarded sync log store for tests and local runs.
// Purpose: Provide the full store contract without a database.
// Dependencies: async-trait, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemorySyncLogStore`] keeps logs keyed by signature and splits keyed by
//! split id. It enforces the same status transition rules as durable stores.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;

use crate::core::NewSyncLog;
use crate::core::NewSyncLogSplit;
use crate::core::Signature;
use crate::core::SplitId;
use crate::core::SyncLog;
use crate::core::SyncLogId;
use crate::core::SyncLogSplit;
use crate::core::SyncStatus;
use crate::core::Timestamp;
use crate::interfaces::StoreError;
use crate::interfaces::SyncLogStore;

// ============================================================================
// SECTION: State
// ============================================================================

/// Rows held by the in-memory store.
#[derive(Debug, Default)]
struct Tables {
    /// Logs keyed by signature.
    logs: BTreeMap<Signature, SyncLog>,
    /// Splits in insertion order.
    splits: Vec<SyncLogSplit>,
}

impl Tables {
    /// Returns the log with `log_id`.
    fn log_by_id(&self, log_id: &SyncLogId) -> Option<&SyncLog> {
        self.logs.values().find(|log| &log.log_id == log_id)
    }

    /// Returns a mutable split or a not-found error.
    fn split_mut(&mut self, split_id: &SplitId) -> Result<&mut SyncLogSplit, StoreError> {
        self.splits
            .iter_mut()
            .find(|split| &split.split_id == split_id)
            .ok_or_else(|| StoreError::NotFound(format!("split {split_id}")))
    }
}

/// In-memory sync log store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySyncLogStore {
    /// Tables protected by a mutex.
    tables: Arc<Mutex<Tables>>,
}

impl InMemorySyncLogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the tables.
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Store("sync log store mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Store Implementation
// ============================================================================

#[async_trait]
impl SyncLogStore for InMemorySyncLogStore {
    async fn create_log(&self, log: NewSyncLog, now: Timestamp) -> Result<SyncLog, StoreError> {
        let mut tables = self.lock()?;
        let row = tables.logs.entry(log.signature.clone()).or_insert_with(|| SyncLog {
            log_id: SyncLogId::generate(),
            signature: log.signature,
            payload: log.payload,
            created_at: now,
            updated_at: now,
        });
        Ok(row.clone())
    }

    async fn create_split(
        &self,
        split: NewSyncLogSplit,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError> {
        let mut tables = self.lock()?;
        if tables.log_by_id(&split.log_id).is_none() {
            return Err(StoreError::NotFound(format!("log {}", split.log_id)));
        }
        let row = SyncLogSplit {
            split_id: SplitId::generate(),
            log_id: split.log_id,
            kind: split.kind,
            status: SyncStatus::Pending,
            retry_times: 0,
            payload: split.payload,
            created_at: now,
            updated_at: now,
        };
        tables.splits.push(row.clone());
        Ok(row)
    }

    async fn get_split(&self, split_id: &SplitId) -> Result<Option<SyncLogSplit>, StoreError> {
        Ok(self.lock()?.splits.iter().find(|split| &split.split_id == split_id).cloned())
    }

    async fn update_split_status(
        &self,
        split_id: &SplitId,
        status: SyncStatus,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError> {
        let mut tables = self.lock()?;
        let split = tables.split_mut(split_id)?;
        if !split.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                split_id: split_id.to_string(),
                from: split.status,
                to: status,
            });
        }
        split.status = status;
        split.updated_at = now;
        Ok(split.clone())
    }

    async fn abandon_split(
        &self,
        split_id: &SplitId,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError> {
        let mut tables = self.lock()?;
        let split = tables.split_mut(split_id)?;
        split.status = SyncStatus::Failed;
        split.updated_at = now;
        Ok(split.clone())
    }

    async fn increment_retry(
        &self,
        split_id: &SplitId,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError> {
        let mut tables = self.lock()?;
        let split = tables.split_mut(split_id)?;
        split.retry_times = split.retry_times.saturating_add(1);
        split.updated_at = now;
        Ok(split.clone())
    }

    async fn get_log_by_signature(
        &self,
        signature: &Signature,
    ) -> Result<Option<SyncLog>, StoreError> {
        Ok(self.lock()?.logs.get(signature).cloned())
    }

    async fn get_log(&self, log_id: &SyncLogId) -> Result<Option<SyncLog>, StoreError> {
        Ok(self.lock()?.log_by_id(log_id).cloned())
    }

    async fn touch_log(&self, log_id: &SyncLogId, now: Timestamp) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let log = tables
            .logs
            .values_mut()
            .find(|log| &log.log_id == log_id)
            .ok_or_else(|| StoreError::NotFound(format!("log {log_id}")))?;
        log.updated_at = now;
        Ok(())
    }

    async fn splits_by_signature(
        &self,
        signature: &Signature,
    ) -> Result<Vec<SyncLogSplit>, StoreError> {
        let tables = self.lock()?;
        let Some(log) = tables.logs.get(signature) else {
            return Ok(Vec::new());
        };
        Ok(tables.splits.iter().filter(|split| split.log_id == log.log_id).cloned().collect())
    }

    async fn splits_created_between(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<SyncLogSplit>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .splits
            .iter()
            .filter(|split| split.created_at >= from && split.created_at < to)
            .cloned()
            .collect())
    }
}
