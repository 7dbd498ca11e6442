// crates/partner-sync-core/src/core/envelope.rs
// ============================================================================
// Module: Partner Sync Envelopes
// Description: Wire envelopes for inbound batches and derived events.
// Purpose: Decode raw broker payloads into typed batches without side effects.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each inbound subject carries one envelope shape. Envelopes hold the partner
//! signature, the split id (`log_id`), an opaque raw payload, and one or more
//! typed record arrays. Decoding is pure: it never touches the sync log.
//! Invariants:
//! - Payloads larger than [`MAX_ENVELOPE_BYTES`] are rejected before parsing.
//! - A decode failure is permanent; redelivering the same bytes cannot succeed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::identifiers::Signature;
use crate::core::identifiers::SplitId;
use crate::core::kind::ActionKind;
use crate::core::records::AcademicYearRecord;
use crate::core::records::ClassRecord;
use crate::core::records::CourseRecord;
use crate::core::records::LessonRecord;
use crate::core::records::StaffRecord;
use crate::core::records::StudentLessonRecord;
use crate::core::records::StudentRecord;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted envelope size in bytes.
pub const MAX_ENVELOPE_BYTES: usize = 8 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Envelope encode and decode errors.
///
/// # Invariants
/// - Messages never embed the raw payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Payload bytes are not a valid envelope.
    #[error("envelope decode failed: {0}")]
    Decode(String),
    /// Payload exceeds the size limit.
    #[error("envelope too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
    /// Envelope could not be serialized.
    #[error("envelope encode failed: {0}")]
    Encode(String),
}

// ============================================================================
// SECTION: Inbound Envelopes
// ============================================================================

/// Master registration batch (courses, classes, lessons, academic years).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterRegistrationEnvelope {
    /// Partner signature.
    pub signature: Signature,
    /// Split identifier tracked for this batch.
    #[serde(default)]
    pub log_id: SplitId,
    /// Partner timestamp (unix seconds).
    #[serde(default)]
    pub timestamp: i64,
    /// Opaque partner payload kept for audit.
    #[serde(default)]
    pub raw_payload: String,
    /// Course records.
    #[serde(default)]
    pub courses: Vec<CourseRecord>,
    /// Class records.
    #[serde(default)]
    pub classes: Vec<ClassRecord>,
    /// Lesson records.
    #[serde(default)]
    pub lessons: Vec<LessonRecord>,
    /// Academic year records.
    #[serde(default)]
    pub academic_years: Vec<AcademicYearRecord>,
}

/// User registration batch (students, staff).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistrationEnvelope {
    /// Partner signature.
    pub signature: Signature,
    /// Split identifier tracked for this batch.
    #[serde(default)]
    pub log_id: SplitId,
    /// Partner timestamp (unix seconds).
    #[serde(default)]
    pub timestamp: i64,
    /// Opaque partner payload kept for audit.
    #[serde(default)]
    pub raw_payload: String,
    /// Student records.
    #[serde(default)]
    pub students: Vec<StudentRecord>,
    /// Staff records.
    #[serde(default)]
    pub staffs: Vec<StaffRecord>,
}

/// User course batch (student lesson assignments).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCourseEnvelope {
    /// Partner signature.
    pub signature: Signature,
    /// Split identifier tracked for this batch.
    #[serde(default)]
    pub log_id: SplitId,
    /// Partner timestamp (unix seconds).
    #[serde(default)]
    pub timestamp: i64,
    /// Opaque partner payload kept for audit.
    #[serde(default)]
    pub raw_payload: String,
    /// Student lesson records.
    #[serde(default)]
    pub student_lessons: Vec<StudentLessonRecord>,
}

// ============================================================================
// SECTION: Derived Envelope
// ============================================================================

/// One student package with partner class ids resolved to course ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    /// Partner action of the owning student record.
    pub action_kind: ActionKind,
    /// Student identifier.
    pub student_id: String,
    /// Partner class identifier.
    pub class_id: i64,
    /// Course identifiers currently attached to the class.
    pub course_ids: Vec<String>,
    /// Package start (unix seconds).
    pub start_date: i64,
    /// Package end (unix seconds).
    pub end_date: i64,
}

/// Derived event published once per applied student package chunk.
///
/// # Invariants
/// - Every entry references a class id that resolved to a course set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentPackageResolved {
    /// Signature of the inbound batch.
    pub signature: Signature,
    /// Split identifier of the inbound batch.
    #[serde(default)]
    pub log_id: SplitId,
    /// Resolved package entries.
    pub packages: Vec<ResolvedPackage>,
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Decodes raw broker bytes into an envelope.
///
/// # Errors
///
/// Returns [`EnvelopeError`] when the payload is oversized or malformed.
pub fn decode_envelope<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, EnvelopeError> {
    if bytes.len() > MAX_ENVELOPE_BYTES {
        return Err(EnvelopeError::TooLarge {
            max_bytes: MAX_ENVELOPE_BYTES,
            actual_bytes: bytes.len(),
        });
    }
    serde_json::from_slice(bytes).map_err(|err| EnvelopeError::Decode(err.to_string()))
}

/// Encodes an envelope into broker bytes.
///
/// # Errors
///
/// Returns [`EnvelopeError::Encode`] when serialization fails.
pub fn encode_envelope<T: Serialize>(envelope: &T) -> Result<Vec<u8>, EnvelopeError> {
    serde_json::to_vec(envelope).map_err(|err| EnvelopeError::Encode(err.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
