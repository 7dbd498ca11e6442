// crates/partner-sync-core/src/core/mod.rs
// ============================================================================
// Module: Partner Sync Core Types
// Description: Data model shared by the sync engine, stores, and transports.
// Purpose: Group identifiers, kinds, records, envelopes, and sync log rows.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Core types are plain data: they carry no I/O and no wall-clock reads.
//! Hosts supply timestamps through [`crate::interfaces::Clock`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod envelope;
pub mod identifiers;
pub mod kind;
pub mod records;
pub mod status;
pub mod sync_log;
pub mod telemetry;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use envelope::EnvelopeError;
pub use envelope::MAX_ENVELOPE_BYTES;
pub use envelope::MasterRegistrationEnvelope;
pub use envelope::ResolvedPackage;
pub use envelope::StudentPackageResolved;
pub use envelope::UserCourseEnvelope;
pub use envelope::UserRegistrationEnvelope;
pub use envelope::decode_envelope;
pub use envelope::encode_envelope;
pub use identifiers::Signature;
pub use identifiers::SplitId;
pub use identifiers::SyncLogId;
pub use kind::ActionKind;
pub use kind::HandlerKind;
pub use kind::InboundSubject;
pub use kind::SyncKind;
pub use records::AcademicYearRecord;
pub use records::ClassRecord;
pub use records::CourseRecord;
pub use records::LessonRecord;
pub use records::StaffRecord;
pub use records::StudentLessonRecord;
pub use records::StudentPackageRecord;
pub use records::StudentRecord;
pub use status::InvalidStatusError;
pub use status::SyncStatus;
pub use sync_log::NewSyncLog;
pub use sync_log::NewSyncLogSplit;
pub use sync_log::StatusCounts;
pub use sync_log::SyncLog;
pub use sync_log::SyncLogSplit;
pub use telemetry::BatchEvent;
pub use telemetry::BatchOutcome;
pub use telemetry::EngineEvent;
pub use time::Timestamp;
