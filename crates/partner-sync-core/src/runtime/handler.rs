// crates/partner-sync-core/src/runtime/handler.rs
// ============================================================================
// Module: Sync Handler Engine
// Description: Per-kind handler state machine for delivered batches.
// Purpose: Decode, filter, track, and apply batches with broker dispositions.
// Dependencies: tokio, thiserror, crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! [`SyncEngine::handle`] runs one delivered message through
//! `Decoding -> (Stale-Skip | Marking-Processing -> Dispatching -> Marking-Terminal)`
//! under a hard deadline and reports a [`Disposition`] for the broker.
//! Invariants:
//! - Decode failures are never redelivered.
//! - Chunks are applied sequentially and the first failure aborts the batch.
//! - Every handled delivery emits exactly one [`BatchEvent`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;

use crate::core::AcademicYearRecord;
use crate::core::BatchEvent;
use crate::core::BatchOutcome;
use crate::core::ClassRecord;
use crate::core::CourseRecord;
use crate::core::EngineEvent;
use crate::core::EnvelopeError;
use crate::core::HandlerKind;
use crate::core::LessonRecord;
use crate::core::MasterRegistrationEnvelope;
use crate::core::Signature;
use crate::core::SplitId;
use crate::core::StaffRecord;
use crate::core::StudentLessonRecord;
use crate::core::StudentRecord;
use crate::core::SyncStatus;
use crate::core::UserCourseEnvelope;
use crate::core::UserRegistrationEnvelope;
use crate::core::decode_envelope;
use crate::interfaces::ApplyError;
use crate::interfaces::Clock;
use crate::interfaces::SyncApplier;
use crate::interfaces::SyncLogStore;
use crate::interfaces::SyncTelemetry;
use crate::runtime::chunk::ChunkError;
use crate::runtime::chunk::ChunkRanges;
use crate::runtime::clock::SystemClock;
use crate::runtime::derived::DerivedError;
use crate::runtime::derived::StudentPackagePublisher;
use crate::runtime::service::Staleness;
use crate::runtime::service::SyncLogError;
use crate::runtime::service::SyncLogService;
use crate::runtime::telemetry::NoopTelemetry;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Default records per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default staleness window.
pub const DEFAULT_STALENESS_WINDOW: Duration = Duration::from_secs(60 * 60);
/// Default per-message handler deadline.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables shared by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Records per chunk.
    pub chunk_size: usize,
    /// Maximum log age before a batch counts as a stale redelivery.
    pub staleness_window: Duration,
    /// Hard deadline for one delivery.
    pub handler_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            staleness_window: DEFAULT_STALENESS_WINDOW,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }
}

// ============================================================================
// SECTION: Appliers
// ============================================================================

/// Domain appliers, one per handler kind.
#[derive(Clone)]
pub struct Appliers {
    /// Course upserts.
    pub course: Arc<dyn SyncApplier<CourseRecord>>,
    /// Course to academic year association.
    pub course_academic_year: Arc<dyn SyncApplier<CourseRecord>>,
    /// Class upserts.
    pub class: Arc<dyn SyncApplier<ClassRecord>>,
    /// Live lesson upserts.
    pub lesson: Arc<dyn SyncApplier<LessonRecord>>,
    /// Academic year upserts.
    pub academic_year: Arc<dyn SyncApplier<AcademicYearRecord>>,
    /// Student account upserts.
    pub student: Arc<dyn SyncApplier<StudentRecord>>,
    /// Staff account upserts.
    pub staff: Arc<dyn SyncApplier<StaffRecord>>,
    /// Class membership projection.
    pub class_member: Arc<dyn SyncApplier<StudentRecord>>,
    /// Student package projection.
    pub student_package: Arc<dyn SyncApplier<StudentRecord>>,
    /// Student lesson assignments.
    pub student_lesson: Arc<dyn SyncApplier<StudentLessonRecord>>,
}

// ============================================================================
// SECTION: Outcomes and Errors
// ============================================================================

/// Broker acknowledgement decision for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Acknowledge; the message is done.
    Ack,
    /// Negative-acknowledge; the broker should redeliver.
    Redeliver,
    /// Terminate; the broker must not redeliver.
    Terminate,
}

/// Successful handler outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Every chunk was applied and the split marked successful.
    Applied {
        /// Records in the batch.
        record_count: usize,
        /// Chunks applied.
        chunk_count: usize,
    },
    /// Batch was older than the staleness window.
    SkippedStale,
    /// Envelope carried no records for this handler.
    SkippedEmpty,
}

/// Failure of a single chunk.
#[derive(Debug, Error)]
pub enum ChunkFailure {
    /// Domain applier failed.
    #[error(transparent)]
    Apply(#[from] ApplyError),
    /// Derived event could not be produced.
    #[error(transparent)]
    Derived(#[from] DerivedError),
}

/// Handler errors.
#[derive(Debug, Error)]
pub enum HandleError {
    /// Envelope could not be decoded.
    #[error(transparent)]
    Decode(#[from] EnvelopeError),
    /// Staleness lookup failed.
    #[error("staleness check failed: {0}")]
    Staleness(#[source] SyncLogError),
    /// Split status could not be updated.
    #[error("split status update failed: {0}")]
    Status(#[source] SyncLogError),
    /// A chunk failed.
    #[error(transparent)]
    Dispatch(#[from] ChunkError<ChunkFailure>),
    /// Handler exceeded its deadline.
    #[error("handler timed out after {} ms", .0.as_millis())]
    Timeout(Duration),
}

impl HandleError {
    /// Returns the broker disposition for this error.
    #[must_use]
    pub const fn disposition(&self) -> Disposition {
        match self {
            Self::Decode(_) => Disposition::Terminate,
            Self::Staleness(_) | Self::Status(_) | Self::Dispatch(_) | Self::Timeout(_) => {
                Disposition::Redeliver
            }
        }
    }

    /// Returns a stable label for telemetry.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Staleness(_) => "staleness",
            Self::Status(_) => "status",
            Self::Dispatch(_) => "dispatch",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Engine construction errors.
#[derive(Debug, Error)]
pub enum EngineBuildError {
    /// No appliers were supplied.
    #[error("domain appliers are required")]
    MissingAppliers,
    /// No student package publisher was supplied.
    #[error("student package publisher is required")]
    MissingPackagePublisher,
    /// Settings are invalid.
    #[error("invalid sync settings: {0}")]
    InvalidSettings(String),
}

// ============================================================================
// SECTION: Chunk Steps
// ============================================================================

/// Work performed for one chunk of a batch.
#[async_trait]
trait ChunkStep<R>: Send + Sync
where
    R: Send + Sync,
{
    /// Processes one chunk.
    async fn run(&self, records: &[R]) -> Result<(), ChunkFailure>;
}

/// Step that hands the chunk to a domain applier.
struct ApplyStep<'a, R> {
    /// Target applier.
    applier: &'a dyn SyncApplier<R>,
}

#[async_trait]
impl<R> ChunkStep<R> for ApplyStep<'_, R>
where
    R: Send + Sync,
{
    async fn run(&self, records: &[R]) -> Result<(), ChunkFailure> {
        Ok(self.applier.apply(records).await?)
    }
}

/// Step that applies student packages and then publishes the derived event.
struct PackageStep<'a> {
    /// Target applier.
    applier: &'a dyn SyncApplier<StudentRecord>,
    /// Derived event publisher.
    publisher: &'a StudentPackagePublisher,
    /// Batch signature.
    signature: &'a Signature,
    /// Batch split id.
    log_id: &'a SplitId,
}

#[async_trait]
impl ChunkStep<StudentRecord> for PackageStep<'_> {
    async fn run(&self, records: &[StudentRecord]) -> Result<(), ChunkFailure> {
        self.applier.apply(records).await?;
        self.publisher.publish_chunk(self.signature, self.log_id, records).await?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Trace
// ============================================================================

/// Facts gathered while handling one delivery, for telemetry.
#[derive(Debug, Default)]
struct BatchTrace {
    /// Decoded signature.
    signature: Option<String>,
    /// Decoded split id.
    log_id: Option<String>,
    /// Records for the handler.
    record_count: usize,
    /// Chunks applied so far.
    chunk_count: usize,
}

impl BatchTrace {
    /// Records the decoded envelope identity.
    fn observe(&mut self, signature: &Signature, log_id: &SplitId, record_count: usize) {
        self.signature = Some(signature.to_string());
        self.log_id = Some(log_id.to_string());
        self.record_count = record_count;
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Handler set for every sync kind.
pub struct SyncEngine {
    /// Sync log operations.
    service: SyncLogService,
    /// Domain appliers.
    appliers: Appliers,
    /// Derived student package publisher.
    packages: StudentPackagePublisher,
    /// Telemetry sink.
    telemetry: Arc<dyn SyncTelemetry>,
    /// Handler tunables.
    settings: SyncSettings,
}

impl SyncEngine {
    /// Starts building an engine over `store`.
    #[must_use]
    pub fn builder(store: Arc<dyn SyncLogStore>) -> SyncEngineBuilder {
        SyncEngineBuilder::new(store)
    }

    /// Returns the sync log service.
    #[must_use]
    pub const fn service(&self) -> &SyncLogService {
        &self.service
    }

    /// Returns the handler tunables.
    #[must_use]
    pub const fn settings(&self) -> SyncSettings {
        self.settings
    }

    /// Returns the telemetry sink.
    #[must_use]
    pub fn telemetry(&self) -> &Arc<dyn SyncTelemetry> {
        &self.telemetry
    }

    /// Handles one delivery and returns the broker disposition.
    pub async fn handle_delivery(&self, kind: HandlerKind, payload: &[u8]) -> Disposition {
        match self.handle(kind, payload).await {
            Ok(_) => Disposition::Ack,
            Err(err) => err.disposition(),
        }
    }

    /// Handles one delivery under the handler deadline.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError`]; use [`HandleError::disposition`] to decide
    /// whether the broker should redeliver.
    pub async fn handle(
        &self,
        kind: HandlerKind,
        payload: &[u8],
    ) -> Result<HandleOutcome, HandleError> {
        let started = Instant::now();
        let mut trace = BatchTrace::default();
        let deadline = self.settings.handler_timeout;
        let result = tokio::time::timeout(deadline, self.process(kind, payload, &mut trace))
            .await
            .unwrap_or(Err(HandleError::Timeout(deadline)));
        self.record(kind, &trace, &result, started.elapsed());
        result
    }

    /// Decodes the envelope for `kind` and runs the batch.
    async fn process(
        &self,
        kind: HandlerKind,
        payload: &[u8],
        trace: &mut BatchTrace,
    ) -> Result<HandleOutcome, HandleError> {
        let appliers = &self.appliers;
        match kind {
            HandlerKind::Course | HandlerKind::CourseAcademicYear => {
                let envelope: MasterRegistrationEnvelope = decode_envelope(payload)?;
                let applier = if kind == HandlerKind::Course {
                    appliers.course.as_ref()
                } else {
                    appliers.course_academic_year.as_ref()
                };
                let step = ApplyStep {
                    applier,
                };
                self.run_batch(
                    kind,
                    &envelope.signature,
                    &envelope.log_id,
                    &envelope.courses,
                    &step,
                    trace,
                )
                .await
            }
            HandlerKind::Class => {
                let envelope: MasterRegistrationEnvelope = decode_envelope(payload)?;
                let step = ApplyStep {
                    applier: appliers.class.as_ref(),
                };
                self.run_batch(
                    kind,
                    &envelope.signature,
                    &envelope.log_id,
                    &envelope.classes,
                    &step,
                    trace,
                )
                .await
            }
            HandlerKind::Lesson => {
                let envelope: MasterRegistrationEnvelope = decode_envelope(payload)?;
                let step = ApplyStep {
                    applier: appliers.lesson.as_ref(),
                };
                self.run_batch(
                    kind,
                    &envelope.signature,
                    &envelope.log_id,
                    &envelope.lessons,
                    &step,
                    trace,
                )
                .await
            }
            HandlerKind::AcademicYear => {
                let envelope: MasterRegistrationEnvelope = decode_envelope(payload)?;
                let step = ApplyStep {
                    applier: appliers.academic_year.as_ref(),
                };
                self.run_batch(
                    kind,
                    &envelope.signature,
                    &envelope.log_id,
                    &envelope.academic_years,
                    &step,
                    trace,
                )
                .await
            }
            HandlerKind::Student | HandlerKind::ClassMember => {
                let envelope: UserRegistrationEnvelope = decode_envelope(payload)?;
                let applier = if kind == HandlerKind::Student {
                    appliers.student.as_ref()
                } else {
                    appliers.class_member.as_ref()
                };
                let step = ApplyStep {
                    applier,
                };
                self.run_batch(
                    kind,
                    &envelope.signature,
                    &envelope.log_id,
                    &envelope.students,
                    &step,
                    trace,
                )
                .await
            }
            HandlerKind::StudentPackage => {
                let envelope: UserRegistrationEnvelope = decode_envelope(payload)?;
                let step = PackageStep {
                    applier: appliers.student_package.as_ref(),
                    publisher: &self.packages,
                    signature: &envelope.signature,
                    log_id: &envelope.log_id,
                };
                self.run_batch(
                    kind,
                    &envelope.signature,
                    &envelope.log_id,
                    &envelope.students,
                    &step,
                    trace,
                )
                .await
            }
            HandlerKind::Staff => {
                let envelope: UserRegistrationEnvelope = decode_envelope(payload)?;
                let step = ApplyStep {
                    applier: appliers.staff.as_ref(),
                };
                self.run_batch(
                    kind,
                    &envelope.signature,
                    &envelope.log_id,
                    &envelope.staffs,
                    &step,
                    trace,
                )
                .await
            }
            HandlerKind::StudentLesson => {
                let envelope: UserCourseEnvelope = decode_envelope(payload)?;
                let step = ApplyStep {
                    applier: appliers.student_lesson.as_ref(),
                };
                self.run_batch(
                    kind,
                    &envelope.signature,
                    &envelope.log_id,
                    &envelope.student_lessons,
                    &step,
                    trace,
                )
                .await
            }
        }
    }

    /// Runs the tracked part of the state machine for decoded records.
    async fn run_batch<R>(
        &self,
        kind: HandlerKind,
        signature: &Signature,
        split_id: &SplitId,
        records: &[R],
        step: &dyn ChunkStep<R>,
        trace: &mut BatchTrace,
    ) -> Result<HandleOutcome, HandleError>
    where
        R: Send + Sync,
    {
        trace.observe(signature, split_id, records.len());
        if records.is_empty() {
            return Ok(HandleOutcome::SkippedEmpty);
        }
        if kind.checks_staleness() {
            let staleness = self
                .service
                .check_staleness(signature, self.settings.staleness_window)
                .await
                .map_err(HandleError::Staleness)?;
            if matches!(staleness, Staleness::Stale { .. }) {
                return Ok(HandleOutcome::SkippedStale);
            }
        }
        self.service
            .update_status(split_id, SyncStatus::Processing)
            .await
            .map_err(HandleError::Status)?;
        match self.dispatch(records, step, trace).await {
            Ok(chunk_count) => {
                self.service
                    .update_status(split_id, SyncStatus::Success)
                    .await
                    .map_err(HandleError::Status)?;
                Ok(HandleOutcome::Applied {
                    record_count: records.len(),
                    chunk_count,
                })
            }
            Err(err) => {
                let marked = self.service.update_status(split_id, SyncStatus::Failed).await;
                if let Err(mark_err) = marked {
                    self.telemetry.record_engine(&EngineEvent {
                        event: "split_mark_failed_error",
                        timestamp_ms: self.service.clock().now().as_unix_millis(),
                        handler: Some(kind.label()),
                        message: mark_err.to_string(),
                    });
                }
                Err(HandleError::Dispatch(err))
            }
        }
    }

    /// Applies `records` chunk by chunk and returns the number of chunks.
    async fn dispatch<R>(
        &self,
        records: &[R],
        step: &dyn ChunkStep<R>,
        trace: &mut BatchTrace,
    ) -> Result<usize, ChunkError<ChunkFailure>>
    where
        R: Send + Sync,
    {
        let ranges = ChunkRanges::new(records.len(), self.settings.chunk_size)
            .ok_or(ChunkError::InvalidChunkSize)?;
        for range in ranges {
            let chunk = records.get(range.clone()).unwrap_or_default();
            step.run(chunk).await.map_err(|source| ChunkError::Failed {
                range,
                source,
            })?;
            trace.chunk_count += 1;
        }
        Ok(trace.chunk_count)
    }

    /// Emits the batch telemetry event.
    fn record(
        &self,
        kind: HandlerKind,
        trace: &BatchTrace,
        result: &Result<HandleOutcome, HandleError>,
        elapsed: Duration,
    ) {
        let (outcome, error_kind, error) = match result {
            Ok(HandleOutcome::Applied {
                ..
            }) => (BatchOutcome::Applied, None, None),
            Ok(HandleOutcome::SkippedStale) => (BatchOutcome::SkippedStale, None, None),
            Ok(HandleOutcome::SkippedEmpty) => (BatchOutcome::SkippedEmpty, None, None),
            Err(err) => {
                let outcome = match err.disposition() {
                    Disposition::Terminate => BatchOutcome::Terminated,
                    Disposition::Ack | Disposition::Redeliver => BatchOutcome::Redeliver,
                };
                (outcome, Some(err.kind_label()), Some(err.to_string()))
            }
        };
        self.telemetry.record_batch(&BatchEvent {
            event: "batch_handled",
            timestamp_ms: self.service.clock().now().as_unix_millis(),
            handler: kind.label(),
            signature: trace.signature.clone(),
            log_id: trace.log_id.clone(),
            record_count: trace.record_count,
            chunk_count: trace.chunk_count,
            outcome,
            error_kind,
            error,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        });
    }
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builder for [`SyncEngine`].
pub struct SyncEngineBuilder {
    /// Sync log store.
    store: Arc<dyn SyncLogStore>,
    /// Domain appliers.
    appliers: Option<Appliers>,
    /// Derived student package publisher.
    packages: Option<StudentPackagePublisher>,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Telemetry sink.
    telemetry: Arc<dyn SyncTelemetry>,
    /// Handler tunables.
    settings: SyncSettings,
}

impl SyncEngineBuilder {
    /// Creates a builder with the system clock, no-op telemetry, and default settings.
    #[must_use]
    pub fn new(store: Arc<dyn SyncLogStore>) -> Self {
        Self {
            store,
            appliers: None,
            packages: None,
            clock: Arc::new(SystemClock),
            telemetry: Arc::new(NoopTelemetry),
            settings: SyncSettings::default(),
        }
    }

    /// Sets the domain appliers.
    #[must_use]
    pub fn appliers(mut self, appliers: Appliers) -> Self {
        self.appliers = Some(appliers);
        self
    }

    /// Sets the derived student package publisher.
    #[must_use]
    pub fn package_publisher(mut self, packages: StudentPackagePublisher) -> Self {
        self.packages = Some(packages);
        self
    }

    /// Sets the time source.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the telemetry sink.
    #[must_use]
    pub fn telemetry(mut self, telemetry: Arc<dyn SyncTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Sets the handler tunables.
    #[must_use]
    pub const fn settings(mut self, settings: SyncSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineBuildError`] when a collaborator is missing or the
    /// settings are invalid.
    pub fn build(self) -> Result<SyncEngine, EngineBuildError> {
        if self.settings.chunk_size == 0 {
            return Err(EngineBuildError::InvalidSettings(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.settings.handler_timeout.is_zero() {
            return Err(EngineBuildError::InvalidSettings(
                "handler_timeout must be positive".to_string(),
            ));
        }
        let appliers = self.appliers.ok_or(EngineBuildError::MissingAppliers)?;
        let packages = self.packages.ok_or(EngineBuildError::MissingPackagePublisher)?;
        Ok(SyncEngine {
            service: SyncLogService::new(self.store, self.clock),
            appliers,
            packages,
            telemetry: self.telemetry,
            settings: self.settings,
        })
    }
}
