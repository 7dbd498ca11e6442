// crates/partner-sync-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Sync Log Store
// Description: Durable SyncLogStore backed by SQLite WAL.
// Purpose: Persist sync logs and their splits with validated transitions.
// Dependencies: partner-sync-core, rusqlite, serde, thiserror, tokio
// ============================================================================

//! ## Overview
//! This module implements a durable [`SyncLogStore`] using `SQLite`. Logs live
//! in `partner_sync_data_log` keyed by a unique signature; splits live in
//! `partner_sync_data_log_split` and reference their log. Every write touches
//! a single row inside its own transaction, so split status checks and updates
//! are atomic with respect to concurrent consumers.
//!
//! Blocking `SQLite` calls run on the tokio blocking pool behind a mutex
//! guarded connection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use partner_sync_core::NewSyncLog;
use partner_sync_core::NewSyncLogSplit;
use partner_sync_core::Signature;
use partner_sync_core::SplitId;
use partner_sync_core::StoreError;
use partner_sync_core::SyncKind;
use partner_sync_core::SyncLog;
use partner_sync_core::SyncLogId;
use partner_sync_core::SyncLogSplit;
use partner_sync_core::SyncLogStore;
use partner_sync_core::SyncStatus;
use partner_sync_core::Timestamp;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Current schema version stored in `store_meta`.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout applied to connections.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum length of the full store path.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Split columns in the order read by [`SplitRow::from_row`].
const SPLIT_COLUMNS: &str =
    "split_id, log_id, kind, status, retry_times, payload, created_at, updated_at";
/// Log columns in the order read by [`log_from_row`].
const LOG_COLUMNS: &str = "log_id, signature, payload, created_at, updated_at";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` sync log store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Returns a config for `path` with default pragmas.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw split payloads.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Referenced row does not exist.
    #[error("sqlite store row not found: {0}")]
    NotFound(String),
    /// Split status transition rejected.
    #[error("sqlite store rejected transition for {split_id}: {from} -> {to}")]
    InvalidTransition {
        /// Split identifier.
        split_id: String,
        /// Current status.
        from: SyncStatus,
        /// Requested status.
        to: SyncStatus,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::NotFound(message) => Self::NotFound(message),
            SqliteStoreError::InvalidTransition {
                split_id,
                from,
                to,
            } => Self::InvalidTransition {
                split_id,
                from,
                to,
            },
        }
    }
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed sync log store with WAL support.
///
/// # Invariants
/// - `SQLite` connection access is serialized through a mutex.
/// - Split status changes are validated inside the same transaction that
///   writes them.
#[derive(Clone)]
pub struct SqliteSyncLogStore {
    /// Store configuration.
    config: SqliteStoreConfig,
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteSyncLogStore {
    /// Opens an `SQLite`-backed sync log store, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }

    /// Runs `operation` against the connection on the blocking pool.
    async fn with_connection<T, F>(&self, operation: F) -> Result<T, SqliteStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, SqliteStoreError> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let mut guard = connection
                .lock()
                .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))?;
            operation(&mut guard)
        })
        .await
        .map_err(|err| SqliteStoreError::Io(format!("sqlite task join failed: {err}")))?
    }

    /// Applies `mutate` to a split inside a transaction and returns the row.
    async fn mutate_split<F>(
        &self,
        split_id: &SplitId,
        mutate: F,
    ) -> Result<SyncLogSplit, SqliteStoreError>
    where
        F: FnOnce(&mut SyncLogSplit) -> Result<(), SqliteStoreError> + Send + 'static,
    {
        let split_id = split_id.clone();
        self.with_connection(move |connection| {
            let tx = connection.transaction()?;
            let mut split = load_split(&tx, &split_id)?
                .ok_or_else(|| SqliteStoreError::NotFound(format!("split {split_id}")))?;
            mutate(&mut split)?;
            tx.execute(
                "UPDATE partner_sync_data_log_split SET status = ?1, retry_times = ?2, \
                 updated_at = ?3 WHERE split_id = ?4",
                params![
                    split.status.as_str(),
                    i64::from(split.retry_times),
                    split.updated_at.as_unix_millis(),
                    split.split_id.as_str(),
                ],
            )?;
            tx.commit()?;
            Ok(split)
        })
        .await
    }
}

// ============================================================================
// SECTION: Store Implementation
// ============================================================================

#[async_trait]
impl SyncLogStore for SqliteSyncLogStore {
    async fn create_log(&self, log: NewSyncLog, now: Timestamp) -> Result<SyncLog, StoreError> {
        let row = self
            .with_connection(move |connection| {
                let tx = connection.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO partner_sync_data_log (log_id, signature, payload, \
                     created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                    params![
                        SyncLogId::generate().as_str(),
                        log.signature.as_str(),
                        log.payload,
                        now.as_unix_millis(),
                    ],
                )?;
                let row = load_log_by_signature(&tx, &log.signature)?.ok_or_else(|| {
                    SqliteStoreError::Db(format!("log {} missing after insert", log.signature))
                })?;
                tx.commit()?;
                Ok(row)
            })
            .await?;
        Ok(row)
    }

    async fn create_split(
        &self,
        split: NewSyncLogSplit,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError> {
        let row = self
            .with_connection(move |connection| {
                let tx = connection.transaction()?;
                let exists: Option<i64> = tx
                    .query_row(
                        "SELECT 1 FROM partner_sync_data_log WHERE log_id = ?1",
                        params![split.log_id.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?;
                if exists.is_none() {
                    return Err(SqliteStoreError::NotFound(format!("log {}", split.log_id)));
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
                tx.execute(
                    "INSERT INTO partner_sync_data_log_split (split_id, log_id, kind, status, \
                     retry_times, payload, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, \
                     ?6, ?7, ?7)",
                    params![
                        row.split_id.as_str(),
                        row.log_id.as_str(),
                        row.kind.as_str(),
                        row.status.as_str(),
                        i64::from(row.retry_times),
                        row.payload.as_str(),
                        now.as_unix_millis(),
                    ],
                )?;
                tx.commit()?;
                Ok(row)
            })
            .await?;
        Ok(row)
    }

    async fn get_split(&self, split_id: &SplitId) -> Result<Option<SyncLogSplit>, StoreError> {
        let split_id = split_id.clone();
        let row = self
            .with_connection(move |connection| {
                let tx = connection.transaction()?;
                let row = load_split(&tx, &split_id)?;
                tx.commit()?;
                Ok(row)
            })
            .await?;
        Ok(row)
    }

    async fn update_split_status(
        &self,
        split_id: &SplitId,
        status: SyncStatus,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError> {
        let row = self
            .mutate_split(split_id, move |split| {
                if !split.status.can_transition_to(status) {
                    return Err(SqliteStoreError::InvalidTransition {
                        split_id: split.split_id.to_string(),
                        from: split.status,
                        to: status,
                    });
                }
                split.status = status;
                split.updated_at = now;
                Ok(())
            })
            .await?;
        Ok(row)
    }

    async fn abandon_split(
        &self,
        split_id: &SplitId,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError> {
        let row = self
            .mutate_split(split_id, move |split| {
                split.status = SyncStatus::Failed;
                split.updated_at = now;
                Ok(())
            })
            .await?;
        Ok(row)
    }

    async fn increment_retry(
        &self,
        split_id: &SplitId,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError> {
        let row = self
            .mutate_split(split_id, move |split| {
                split.retry_times = split.retry_times.saturating_add(1);
                split.updated_at = now;
                Ok(())
            })
            .await?;
        Ok(row)
    }

    async fn get_log_by_signature(
        &self,
        signature: &Signature,
    ) -> Result<Option<SyncLog>, StoreError> {
        let signature = signature.clone();
        let row = self
            .with_connection(move |connection| {
                let tx = connection.transaction()?;
                let row = load_log_by_signature(&tx, &signature)?;
                tx.commit()?;
                Ok(row)
            })
            .await?;
        Ok(row)
    }

    async fn get_log(&self, log_id: &SyncLogId) -> Result<Option<SyncLog>, StoreError> {
        let log_id = log_id.clone();
        let row = self
            .with_connection(move |connection| {
                let sql =
                    format!("SELECT {LOG_COLUMNS} FROM partner_sync_data_log WHERE log_id = ?1");
                connection
                    .query_row(
                        &sql,
                        params![log_id.as_str()],
                        log_from_row,
                    )
                    .optional()
                    .map_err(SqliteStoreError::from)
            })
            .await?;
        Ok(row)
    }

    async fn touch_log(&self, log_id: &SyncLogId, now: Timestamp) -> Result<(), StoreError> {
        let log_id = log_id.clone();
        self.with_connection(move |connection| {
            let updated = connection.execute(
                "UPDATE partner_sync_data_log SET updated_at = ?1 WHERE log_id = ?2",
                params![now.as_unix_millis(), log_id.as_str()],
            )?;
            if updated == 0 {
                return Err(SqliteStoreError::NotFound(format!("log {log_id}")));
            }
            Ok(())
        })
        .await?;
        Ok(())
    }

    async fn splits_by_signature(
        &self,
        signature: &Signature,
    ) -> Result<Vec<SyncLogSplit>, StoreError> {
        let signature = signature.clone();
        let rows = self
            .with_connection(move |connection| {
                let sql = format!(
                    "SELECT {SPLIT_COLUMNS} FROM partner_sync_data_log_split WHERE log_id = \
                     (SELECT log_id FROM partner_sync_data_log WHERE signature = ?1) ORDER BY \
                     created_at, seq"
                );
                let mut statement = connection.prepare(&sql)?;
                let rows = statement.query_map(params![signature.as_str()], SplitRow::from_row)?;
                collect_splits(rows)
            })
            .await?;
        Ok(rows)
    }

    async fn splits_created_between(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<SyncLogSplit>, StoreError> {
        let rows = self
            .with_connection(move |connection| {
                let sql = format!(
                    "SELECT {SPLIT_COLUMNS} FROM partner_sync_data_log_split WHERE created_at >= \
                     ?1 AND created_at < ?2 ORDER BY created_at, seq"
                );
                let mut statement = connection.prepare(&sql)?;
                let rows = statement.query_map(
                    params![from.as_unix_millis(), to.as_unix_millis()],
                    SplitRow::from_row,
                )?;
                collect_splits(rows)
            })
            .await?;
        Ok(rows)
    }

    async fn readiness(&self) -> Result<(), StoreError> {
        self.with_connection(|connection| {
            connection.query_row("SELECT 1", params![], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Raw split row before label and range validation.
struct SplitRow {
    /// Split identifier.
    split_id: String,
    /// Owning log identifier.
    log_id: String,
    /// Stored kind label.
    kind: String,
    /// Stored status label.
    status: String,
    /// Stored retry count.
    retry_times: i64,
    /// Chunk payload JSON.
    payload: String,
    /// Creation time in unix millis.
    created_at: i64,
    /// Last update in unix millis.
    updated_at: i64,
}

impl SplitRow {
    /// Reads a row selected with [`SPLIT_COLUMNS`].
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            split_id: row.get(0)?,
            log_id: row.get(1)?,
            kind: row.get(2)?,
            status: row.get(3)?,
            retry_times: row.get(4)?,
            payload: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    /// Validates stored labels and converts into a domain split.
    fn into_split(self) -> Result<SyncLogSplit, SqliteStoreError> {
        let kind = SyncKind::parse(&self.kind).ok_or_else(|| {
            SqliteStoreError::Invalid(format!(
                "split {} has unknown kind {}",
                self.split_id, self.kind
            ))
        })?;
        let status = self.status.parse::<SyncStatus>().map_err(|err| {
            SqliteStoreError::Invalid(format!("split {}: {err}", self.split_id))
        })?;
        let retry_times = u32::try_from(self.retry_times).map_err(|_| {
            SqliteStoreError::Invalid(format!(
                "split {} has out of range retry_times {}",
                self.split_id, self.retry_times
            ))
        })?;
        Ok(SyncLogSplit {
            split_id: SplitId::new(self.split_id),
            log_id: SyncLogId::new(self.log_id),
            kind,
            status,
            retry_times,
            payload: self.payload,
            created_at: Timestamp::from_unix_millis(self.created_at),
            updated_at: Timestamp::from_unix_millis(self.updated_at),
        })
    }
}

/// Reads a log row selected with [`LOG_COLUMNS`].
fn log_from_row(row: &Row<'_>) -> rusqlite::Result<SyncLog> {
    Ok(SyncLog {
        log_id: SyncLogId::new(row.get::<_, String>(0)?),
        signature: Signature::new(row.get::<_, String>(1)?),
        payload: row.get(2)?,
        created_at: Timestamp::from_unix_millis(row.get(3)?),
        updated_at: Timestamp::from_unix_millis(row.get(4)?),
    })
}

/// Loads a split by identifier within a transaction.
fn load_split(
    tx: &Transaction<'_>,
    split_id: &SplitId,
) -> Result<Option<SyncLogSplit>, SqliteStoreError> {
    let row = tx
        .query_row(
            &format!("SELECT {SPLIT_COLUMNS} FROM partner_sync_data_log_split WHERE split_id = ?1"),
            params![split_id.as_str()],
            SplitRow::from_row,
        )
        .optional()?;
    row.map(SplitRow::into_split).transpose()
}

/// Loads a log by signature within a transaction.
fn load_log_by_signature(
    tx: &Transaction<'_>,
    signature: &Signature,
) -> Result<Option<SyncLog>, SqliteStoreError> {
    let row = tx
        .query_row(
            &format!("SELECT {LOG_COLUMNS} FROM partner_sync_data_log WHERE signature = ?1"),
            params![signature.as_str()],
            log_from_row,
        )
        .optional()?;
    Ok(row)
}

/// Collects mapped split rows, validating each.
fn collect_splits(
    rows: impl Iterator<Item = rusqlite::Result<SplitRow>>,
) -> Result<Vec<SyncLogSplit>, SqliteStoreError> {
    rows.map(|row| row.map_err(SqliteStoreError::from).and_then(SplitRow::into_split)).collect()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with durable defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS partner_sync_data_log (
                    log_id TEXT PRIMARY KEY,
                    signature TEXT NOT NULL UNIQUE,
                    payload TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS partner_sync_data_log_split (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    split_id TEXT NOT NULL UNIQUE,
                    log_id TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    status TEXT NOT NULL,
                    retry_times INTEGER NOT NULL,
                    payload TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL,
                    FOREIGN KEY (log_id)
                        REFERENCES partner_sync_data_log(log_id) ON DELETE CASCADE
                );
                CREATE INDEX IF NOT EXISTS idx_partner_sync_split_log_id
                    ON partner_sync_data_log_split (log_id);
                CREATE INDEX IF NOT EXISTS idx_partner_sync_split_created_at
                    ON partner_sync_data_log_split (created_at);",
            )?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit()?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
