// crates/partner-sync-core/src/runtime/mod.rs
// ============================================================================
// Module: Partner Sync Runtime
// Description: Handler engine, chunk dispatch, producer, and recovery.
// Purpose: Implement sync semantics on top of the collaborator interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime owns every rule about delivery handling: chunking, staleness,
//! status tracking, derived events, and dispositions. It also carries the
//! in-memory store, clocks, and telemetry sinks used by tests and local runs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod chunk;
pub mod clock;
pub mod derived;
pub mod handler;
pub mod publisher;
pub mod recovery;
pub mod resolver;
pub mod retry;
pub mod service;
pub mod store;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use chunk::ChunkError;
pub use chunk::ChunkRanges;
pub use chunk::for_each_chunk;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use derived::DerivedError;
pub use derived::StudentPackagePublisher;
pub use derived::resolve_packages;
pub use handler::Appliers;
pub use handler::ChunkFailure;
pub use handler::DEFAULT_CHUNK_SIZE;
pub use handler::DEFAULT_HANDLER_TIMEOUT;
pub use handler::DEFAULT_STALENESS_WINDOW;
pub use handler::Disposition;
pub use handler::EngineBuildError;
pub use handler::HandleError;
pub use handler::HandleOutcome;
pub use handler::SyncEngine;
pub use handler::SyncEngineBuilder;
pub use handler::SyncSettings;
pub use publisher::BatchPublishError;
pub use publisher::BatchPublisher;
pub use publisher::InboundSubjects;
pub use publisher::PartnerBatch;
pub use publisher::PublishedBatch;
pub use publisher::split_envelope;
pub use recovery::DEFAULT_IN_FLIGHT_WINDOW;
pub use recovery::DEFAULT_MAX_RANGE_DAYS;
pub use recovery::DEFAULT_RECOVER_MAX_RETRY;
pub use recovery::DateRange;
pub use recovery::DateRangeError;
pub use recovery::RecoveryError;
pub use recovery::RecoveryReport;
pub use recovery::SyncRecovery;
pub use recovery::status_report;
pub use resolver::StaticClassCourseResolver;
pub use retry::RetryPolicy;
pub use service::Staleness;
pub use service::SyncLogError;
pub use service::SyncLogService;
pub use store::InMemorySyncLogStore;
pub use telemetry::JsonLineTelemetry;
pub use telemetry::NoopTelemetry;
