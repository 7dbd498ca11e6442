// crates/partner-sync-core/src/runtime/publisher.rs
// ============================================================================
// Module: Batch Publisher
// Description: Producer side of the sync pipeline.
// Purpose: Log inbound partner batches, split them, and publish chunk envelopes.
// Dependencies: serde_json, thiserror, crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`BatchPublisher::publish`] turns one partner batch into a sync log, one
//! pending split per producer chunk of each kind, and one envelope per split
//! on the inbound subject for that kind. The envelope `log_id` is the split id
//! consumers later drive through the status lifecycle.
//! Invariants:
//! - A repeated signature reuses the existing sync log.
//! - Each split stores the JSON of exactly the records it published, so
//!   recovery can republish without the partner resending.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::AcademicYearRecord;
use crate::core::ClassRecord;
use crate::core::CourseRecord;
use crate::core::EnvelopeError;
use crate::core::InboundSubject;
use crate::core::LessonRecord;
use crate::core::MasterRegistrationEnvelope;
use crate::core::NewSyncLog;
use crate::core::NewSyncLogSplit;
use crate::core::Signature;
use crate::core::SplitId;
use crate::core::StaffRecord;
use crate::core::StudentLessonRecord;
use crate::core::StudentRecord;
use crate::core::SyncKind;
use crate::core::SyncLog;
use crate::core::SyncLogSplit;
use crate::core::UserCourseEnvelope;
use crate::core::UserRegistrationEnvelope;
use crate::core::encode_envelope;
use crate::interfaces::Clock;
use crate::interfaces::EventPublisher;
use crate::interfaces::PublishError;
use crate::interfaces::StoreError;
use crate::interfaces::SyncLogStore;
use crate::runtime::chunk::ChunkRanges;
use crate::runtime::handler::DEFAULT_CHUNK_SIZE;
use crate::runtime::retry::RetryPolicy;

// ============================================================================
// SECTION: Subjects
// ============================================================================

/// Inbound subject names by logical subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundSubjects {
    /// Master registration subject.
    pub master_registration: String,
    /// User registration subject.
    pub user_registration: String,
    /// User course subject.
    pub user_course: String,
}

impl Default for InboundSubjects {
    fn default() -> Self {
        Self {
            master_registration: "SyncMasterRegistration.Synced".to_string(),
            user_registration: "SyncUserRegistration.Synced".to_string(),
            user_course: "SyncUserCourse.Synced".to_string(),
        }
    }
}

impl InboundSubjects {
    /// Returns the subject name for `subject`.
    #[must_use]
    pub fn name(&self, subject: InboundSubject) -> &str {
        match subject {
            InboundSubject::MasterRegistration => &self.master_registration,
            InboundSubject::UserRegistration => &self.user_registration,
            InboundSubject::UserCourse => &self.user_course,
        }
    }
}

// ============================================================================
// SECTION: Batch
// ============================================================================

/// Inbound partner batch, possibly mixing several kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerBatch {
    /// Partner signature.
    pub signature: Signature,
    /// Partner timestamp (unix seconds).
    #[serde(default)]
    pub timestamp: i64,
    /// Opaque raw request body.
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
    /// Student records.
    #[serde(default)]
    pub students: Vec<StudentRecord>,
    /// Staff records.
    #[serde(default)]
    pub staffs: Vec<StaffRecord>,
    /// Student lesson records.
    #[serde(default)]
    pub student_lessons: Vec<StudentLessonRecord>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Producer errors.
#[derive(Debug, Error)]
pub enum BatchPublishError {
    /// Signature was empty.
    #[error("signature is empty")]
    EmptySignature,
    /// Chunk size was zero.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Sync log store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Records could not be encoded.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// Publishing a split envelope failed after retries.
    #[error("publish of split {split_id} failed: {source}")]
    Publish {
        /// Split whose envelope failed.
        split_id: SplitId,
        /// Publish failure.
        #[source]
        source: PublishError,
    },
}

/// Result of publishing one batch.
#[derive(Debug, Clone)]
pub struct PublishedBatch {
    /// Sync log for the batch.
    pub log: SyncLog,
    /// Splits created and published, in publish order.
    pub splits: Vec<SyncLogSplit>,
}

// ============================================================================
// SECTION: Split Envelopes
// ============================================================================

/// Builds the inbound envelope for a split from its stored record JSON.
///
/// # Errors
///
/// Returns [`EnvelopeError`] when the stored payload does not hold records of
/// the split's kind.
pub fn split_envelope(
    kind: SyncKind,
    signature: &Signature,
    split_id: &SplitId,
    timestamp: i64,
    raw_payload: &str,
    records_json: &str,
) -> Result<Vec<u8>, EnvelopeError> {
    let master = || MasterRegistrationEnvelope {
        signature: signature.clone(),
        log_id: split_id.clone(),
        timestamp,
        raw_payload: raw_payload.to_string(),
        ..MasterRegistrationEnvelope::default()
    };
    let user = || UserRegistrationEnvelope {
        signature: signature.clone(),
        log_id: split_id.clone(),
        timestamp,
        raw_payload: raw_payload.to_string(),
        ..UserRegistrationEnvelope::default()
    };
    match kind {
        SyncKind::Course => encode_envelope(&MasterRegistrationEnvelope {
            courses: parse_records(records_json)?,
            ..master()
        }),
        SyncKind::Class => encode_envelope(&MasterRegistrationEnvelope {
            classes: parse_records(records_json)?,
            ..master()
        }),
        SyncKind::Lesson => encode_envelope(&MasterRegistrationEnvelope {
            lessons: parse_records(records_json)?,
            ..master()
        }),
        SyncKind::AcademicYear => encode_envelope(&MasterRegistrationEnvelope {
            academic_years: parse_records(records_json)?,
            ..master()
        }),
        SyncKind::Student => encode_envelope(&UserRegistrationEnvelope {
            students: parse_records(records_json)?,
            ..user()
        }),
        SyncKind::Staff => encode_envelope(&UserRegistrationEnvelope {
            staffs: parse_records(records_json)?,
            ..user()
        }),
        SyncKind::StudentLessons => encode_envelope(&UserCourseEnvelope {
            signature: signature.clone(),
            log_id: split_id.clone(),
            timestamp,
            raw_payload: raw_payload.to_string(),
            student_lessons: parse_records(records_json)?,
        }),
    }
}

/// Parses stored split records.
fn parse_records<R: DeserializeOwned>(records_json: &str) -> Result<Vec<R>, EnvelopeError> {
    serde_json::from_str(records_json).map_err(|err| EnvelopeError::Decode(err.to_string()))
}

/// Serializes records for split storage.
fn records_json<R: Serialize>(records: &[R]) -> Result<String, EnvelopeError> {
    serde_json::to_string(records).map_err(|err| EnvelopeError::Encode(err.to_string()))
}

// ============================================================================
// SECTION: Publisher
// ============================================================================

/// Producer that logs, splits, and publishes partner batches.
#[derive(Clone)]
pub struct BatchPublisher {
    /// Sync log store.
    store: Arc<dyn SyncLogStore>,
    /// Broker publisher.
    publisher: Arc<dyn EventPublisher>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Inbound subject names.
    subjects: InboundSubjects,
    /// Records per split.
    chunk_size: usize,
    /// Publish retry policy.
    retry: RetryPolicy,
}

impl BatchPublisher {
    /// Creates a publisher with default subjects, chunk size, and retry policy.
    #[must_use]
    pub fn new(
        store: Arc<dyn SyncLogStore>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            publisher,
            clock,
            subjects: InboundSubjects::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the inbound subject names.
    #[must_use]
    pub fn with_subjects(mut self, subjects: InboundSubjects) -> Self {
        self.subjects = subjects;
        self
    }

    /// Replaces the records-per-split limit.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Replaces the publish retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the inbound subject names.
    #[must_use]
    pub const fn subjects(&self) -> &InboundSubjects {
        &self.subjects
    }

    /// Logs and publishes every kind carried by `batch`.
    ///
    /// # Errors
    ///
    /// Returns [`BatchPublishError`] on the first store, encode, or publish
    /// failure. Splits published before the failure stay published.
    pub async fn publish(&self, batch: PartnerBatch) -> Result<PublishedBatch, BatchPublishError> {
        if batch.signature.is_empty() {
            return Err(BatchPublishError::EmptySignature);
        }
        let log = self
            .store
            .create_log(
                NewSyncLog {
                    signature: batch.signature.clone(),
                    payload: batch.raw_payload.clone(),
                },
                self.clock.now(),
            )
            .await?;
        let mut published = PublishedBatch {
            log,
            splits: Vec::new(),
        };
        self.publish_kind(&batch, SyncKind::Course, &batch.courses, &mut published).await?;
        self.publish_kind(&batch, SyncKind::Class, &batch.classes, &mut published).await?;
        self.publish_kind(&batch, SyncKind::Lesson, &batch.lessons, &mut published).await?;
        self.publish_kind(&batch, SyncKind::AcademicYear, &batch.academic_years, &mut published)
            .await?;
        self.publish_kind(&batch, SyncKind::Student, &batch.students, &mut published).await?;
        self.publish_kind(&batch, SyncKind::Staff, &batch.staffs, &mut published).await?;
        self.publish_kind(&batch, SyncKind::StudentLessons, &batch.student_lessons, &mut published)
            .await?;
        Ok(published)
    }

    /// Republishes a stored split on the subject for its kind.
    ///
    /// # Errors
    ///
    /// Returns [`BatchPublishError`] when the envelope cannot be rebuilt or
    /// the publish fails after retries.
    pub async fn republish(
        &self,
        log: &SyncLog,
        split: &SyncLogSplit,
    ) -> Result<(), BatchPublishError> {
        let bytes = split_envelope(
            split.kind,
            &log.signature,
            &split.split_id,
            log.created_at.as_unix_millis() / 1_000,
            &log.payload,
            &split.payload,
        )?;
        self.send(split.kind, &split.split_id, bytes).await
    }

    /// Splits and publishes the records of one kind.
    async fn publish_kind<R>(
        &self,
        batch: &PartnerBatch,
        kind: SyncKind,
        records: &[R],
        published: &mut PublishedBatch,
    ) -> Result<(), BatchPublishError>
    where
        R: Serialize + Sync,
    {
        let ranges = ChunkRanges::new(records.len(), self.chunk_size)
            .ok_or(BatchPublishError::InvalidChunkSize)?;
        for range in ranges {
            let chunk = records.get(range).unwrap_or_default();
            let payload = records_json(chunk)?;
            let split = self
                .store
                .create_split(
                    NewSyncLogSplit {
                        log_id: published.log.log_id.clone(),
                        kind,
                        payload,
                    },
                    self.clock.now(),
                )
                .await?;
            let bytes = split_envelope(
                kind,
                &batch.signature,
                &split.split_id,
                batch.timestamp,
                &batch.raw_payload,
                &split.payload,
            )?;
            self.send(kind, &split.split_id, bytes).await?;
            published.splits.push(split);
        }
        Ok(())
    }

    /// Publishes envelope bytes with the retry policy.
    async fn send(
        &self,
        kind: SyncKind,
        split_id: &SplitId,
        bytes: Vec<u8>,
    ) -> Result<(), BatchPublishError> {
        let subject = self.subjects.name(kind.inbound());
        let publisher = &self.publisher;
        self.retry
            .run(move |_| publisher.publish(subject, bytes.clone()))
            .await
            .map_err(|source| BatchPublishError::Publish {
                split_id: split_id.clone(),
                source,
            })
    }
}
