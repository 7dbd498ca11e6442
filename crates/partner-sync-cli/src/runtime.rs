// crates/partner-sync-cli/src/runtime.rs
// ============================================================================
// Module: CLI Runtime Assembly
// Description: Builds stores, telemetry sinks, and sync services from config.
// Purpose: One place where configuration becomes running components.
// Dependencies: partner-sync-core, partner-sync-config, partner-sync-store-sqlite
// ============================================================================

//! ## Overview
//! Every command loads a [`PartnerSyncConfig`] and hands it to the builders in
//! this module. Broker connections are passed in as [`EventPublisher`] trait
//! objects so the same assembly runs against `JetStream` in production and the
//! in-memory broker in tests.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::sync::Arc;

use partner_sync_config::PartnerSyncConfig;
use partner_sync_config::StoreConfig;
use partner_sync_config::StoreType;
use partner_sync_config::TelemetryConfig;
use partner_sync_config::TelemetrySink;
use partner_sync_core::BatchPublisher;
use partner_sync_core::Clock;
use partner_sync_core::DateRange;
use partner_sync_core::EventPublisher;
use partner_sync_core::InMemorySyncLogStore;
use partner_sync_core::JsonLineTelemetry;
use partner_sync_core::NoopTelemetry;
use partner_sync_core::StaticClassCourseResolver;
use partner_sync_core::StudentPackagePublisher;
use partner_sync_core::SyncEngine;
use partner_sync_core::SyncLogStore;
use partner_sync_core::SyncRecovery;
use partner_sync_core::SyncTelemetry;
use partner_sync_store_sqlite::SqliteSyncLogStore;
use thiserror::Error;

use crate::journal::journal_appliers;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while assembling runtime components.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Store could not be opened.
    #[error("store error: {0}")]
    Store(String),
    /// Telemetry sink could not be opened.
    #[error("telemetry error: {0}")]
    Telemetry(String),
    /// Engine assembly failed.
    #[error("engine error: {0}")]
    Engine(String),
    /// Configuration does not support the command.
    #[error("{0}")]
    Unsupported(String),
    /// Date range arguments were rejected.
    #[error("invalid date range: {0}")]
    Range(String),
}

// ============================================================================
// SECTION: Stores and Sinks
// ============================================================================

/// Opens the configured sync log store.
///
/// Opening a `SQLite` store touches the filesystem; call from a blocking
/// context.
///
/// # Errors
///
/// Returns [`RuntimeError::Store`] when the database cannot be opened.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn SyncLogStore>, RuntimeError> {
    match config.sqlite() {
        Some(sqlite) => {
            let store = SqliteSyncLogStore::new(sqlite)
                .map_err(|err| RuntimeError::Store(err.to_string()))?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemorySyncLogStore::new())),
    }
}

/// Opens the configured store, rejecting the in-memory backend.
///
/// Query and recovery commands run in a fresh process, where an in-memory
/// store is always empty.
///
/// # Errors
///
/// Returns [`RuntimeError::Unsupported`] for the memory backend and
/// [`RuntimeError::Store`] when the database cannot be opened.
pub fn open_durable_store(config: &StoreConfig) -> Result<Arc<dyn SyncLogStore>, RuntimeError> {
    if config.store_type == StoreType::Memory {
        return Err(RuntimeError::Unsupported(
            "this command requires [store] type = \"sqlite\"".to_string(),
        ));
    }
    open_store(config)
}

/// Opens the configured telemetry sink.
///
/// # Errors
///
/// Returns [`RuntimeError::Telemetry`] when the output file cannot be opened.
pub fn open_telemetry(config: &TelemetryConfig) -> Result<Arc<dyn SyncTelemetry>, RuntimeError> {
    match (config.sink, &config.path) {
        (TelemetrySink::Stderr, _) => Ok(Arc::new(JsonLineTelemetry::new(io::stderr()))),
        (TelemetrySink::None, _) => Ok(Arc::new(NoopTelemetry)),
        (TelemetrySink::File, Some(path)) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| RuntimeError::Telemetry(err.to_string()))?;
            Ok(Arc::new(JsonLineTelemetry::new(file)))
        }
        (TelemetrySink::File, None) => {
            Err(RuntimeError::Telemetry("file telemetry requires path".to_string()))
        }
    }
}

// ============================================================================
// SECTION: Services
// ============================================================================

/// Builds the handler engine with journal appliers.
///
/// # Errors
///
/// Returns [`RuntimeError`] when the class-course table or engine settings are
/// invalid.
pub fn build_engine(
    config: &PartnerSyncConfig,
    store: Arc<dyn SyncLogStore>,
    publisher: Arc<dyn EventPublisher>,
    telemetry: Arc<dyn SyncTelemetry>,
    clock: Arc<dyn Clock>,
) -> Result<SyncEngine, RuntimeError> {
    let table = config.class_course_map().map_err(|err| RuntimeError::Engine(err.to_string()))?;
    let packages = StudentPackagePublisher::new(
        Arc::new(StaticClassCourseResolver::new(table)),
        publisher,
        config.subjects.student_package.clone(),
    )
    .with_retry(config.retry_policy());
    SyncEngine::builder(store)
        .appliers(journal_appliers(&telemetry, &clock))
        .package_publisher(packages)
        .clock(clock)
        .telemetry(telemetry)
        .settings(config.sync_settings())
        .build()
        .map_err(|err| RuntimeError::Engine(err.to_string()))
}

/// Builds the producer used for publishing and republishing batches.
#[must_use]
pub fn batch_publisher(
    config: &PartnerSyncConfig,
    store: Arc<dyn SyncLogStore>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
) -> BatchPublisher {
    BatchPublisher::new(store, publisher, clock)
        .with_subjects(config.inbound_subjects())
        .with_chunk_size(config.sync.chunk_size)
        .with_retry(config.retry_policy())
}

/// Builds the recovery service.
///
/// A `Processing` split counts as in flight until the broker could have
/// exhausted its redeliveries.
#[must_use]
pub fn recovery(
    config: &PartnerSyncConfig,
    store: Arc<dyn SyncLogStore>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
) -> SyncRecovery {
    let producer = batch_publisher(config, Arc::clone(&store), publisher, Arc::clone(&clock));
    let policy = config.consumer_policy();
    let in_flight_window = policy.ack_wait.saturating_mul(policy.max_deliver);
    SyncRecovery::new(store, producer, clock)
        .with_max_retry(config.sync.recover_max_retry)
        .with_in_flight_window(in_flight_window)
}

/// Parses a `--from`/`--to` pair under the configured range limit.
///
/// # Errors
///
/// Returns [`RuntimeError::Range`] when a bound is missing, malformed,
/// reversed, or the span is too wide.
pub fn date_range(
    config: &PartnerSyncConfig,
    from: &str,
    to: &str,
) -> Result<DateRange, RuntimeError> {
    DateRange::parse(from, to, config.sync.report_max_range_days)
        .map_err(|err| RuntimeError::Range(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
