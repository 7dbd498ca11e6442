// crates/partner-sync-core/src/lib.rs
// ============================================================================
// Module: Partner Sync Core Library
// Description: Public API surface for the partner synchronization engine.
// Purpose: Expose the sync data model, collaborator interfaces, and runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Partner Sync core ingests batched partner change-events, tracks every
//! attempt in a durable sync log, and hands bounded chunks of records to the
//! domain appliers. It is broker- and database-agnostic: transports and
//! stores integrate through the traits in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ApplyError;
pub use interfaces::ClassCourseResolver;
pub use interfaces::Clock;
pub use interfaces::EventPublisher;
pub use interfaces::PublishError;
pub use interfaces::ResolveError;
pub use interfaces::StoreError;
pub use interfaces::SyncApplier;
pub use interfaces::SyncLogStore;
pub use interfaces::SyncTelemetry;
pub use runtime::Appliers;
pub use runtime::BatchPublishError;
pub use runtime::BatchPublisher;
pub use runtime::ChunkError;
pub use runtime::ChunkFailure;
pub use runtime::ChunkRanges;
pub use runtime::DEFAULT_CHUNK_SIZE;
pub use runtime::DEFAULT_HANDLER_TIMEOUT;
pub use runtime::DEFAULT_IN_FLIGHT_WINDOW;
pub use runtime::DEFAULT_MAX_RANGE_DAYS;
pub use runtime::DEFAULT_RECOVER_MAX_RETRY;
pub use runtime::DEFAULT_STALENESS_WINDOW;
pub use runtime::DateRange;
pub use runtime::DateRangeError;
pub use runtime::DerivedError;
pub use runtime::Disposition;
pub use runtime::EngineBuildError;
pub use runtime::HandleError;
pub use runtime::HandleOutcome;
pub use runtime::InMemorySyncLogStore;
pub use runtime::InboundSubjects;
pub use runtime::JsonLineTelemetry;
pub use runtime::ManualClock;
pub use runtime::NoopTelemetry;
pub use runtime::PartnerBatch;
pub use runtime::PublishedBatch;
pub use runtime::RecoveryError;
pub use runtime::RecoveryReport;
pub use runtime::RetryPolicy;
pub use runtime::Staleness;
pub use runtime::StaticClassCourseResolver;
pub use runtime::StudentPackagePublisher;
pub use runtime::SyncEngine;
pub use runtime::SyncEngineBuilder;
pub use runtime::SyncLogError;
pub use runtime::SyncLogService;
pub use runtime::SyncRecovery;
pub use runtime::SyncSettings;
pub use runtime::SystemClock;
pub use runtime::for_each_chunk;
pub use runtime::resolve_packages;
pub use runtime::split_envelope;
pub use runtime::status_report;
