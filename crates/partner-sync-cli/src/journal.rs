// crates/partner-sync-cli/src/journal.rs
// ============================================================================
// Module: Journal Appliers
// Description: Appliers that record applied chunks as engine events.
// Purpose: Let `serve` run end to end without domain services attached.
// Dependencies: async-trait, partner-sync-core
// ============================================================================

//! ## Overview
//! Domain writes (courses, classes, accounts, and so on) belong to services
//! outside this engine. [`JournalApplier`] stands in for them: every applied
//! chunk becomes one `records_applied` [`EngineEvent`] on the telemetry sink,
//! carrying the handler label and record count.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use partner_sync_core::ApplyError;
use partner_sync_core::Appliers;
use partner_sync_core::Clock;
use partner_sync_core::EngineEvent;
use partner_sync_core::HandlerKind;
use partner_sync_core::SyncApplier;
use partner_sync_core::SyncTelemetry;

// ============================================================================
// SECTION: Applier
// ============================================================================

/// Applier that journals chunk sizes for one handler.
pub struct JournalApplier {
    /// Handler whose label is recorded.
    handler: HandlerKind,
    /// Event sink.
    telemetry: Arc<dyn SyncTelemetry>,
    /// Time source for event timestamps.
    clock: Arc<dyn Clock>,
}

impl JournalApplier {
    /// Creates a journal applier for `handler`.
    #[must_use]
    pub fn new(
        handler: HandlerKind,
        telemetry: Arc<dyn SyncTelemetry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            handler,
            telemetry,
            clock,
        }
    }
}

#[async_trait]
impl<R> SyncApplier<R> for JournalApplier
where
    R: Send + Sync,
{
    async fn apply(&self, records: &[R]) -> Result<(), ApplyError> {
        self.telemetry.record_engine(&EngineEvent {
            event: "records_applied",
            timestamp_ms: self.clock.now().as_unix_millis(),
            handler: Some(self.handler.label()),
            message: format!("{} records", records.len()),
        });
        Ok(())
    }
}

/// Builds one journal applier per handler.
#[must_use]
pub fn journal_appliers(telemetry: &Arc<dyn SyncTelemetry>, clock: &Arc<dyn Clock>) -> Appliers {
    let applier = |handler: HandlerKind| {
        Arc::new(JournalApplier::new(handler, Arc::clone(telemetry), Arc::clone(clock)))
    };
    Appliers {
        course: applier(HandlerKind::Course),
        course_academic_year: applier(HandlerKind::CourseAcademicYear),
        class: applier(HandlerKind::Class),
        lesson: applier(HandlerKind::Lesson),
        academic_year: applier(HandlerKind::AcademicYear),
        student: applier(HandlerKind::Student),
        staff: applier(HandlerKind::Staff),
        class_member: applier(HandlerKind::ClassMember),
        student_package: applier(HandlerKind::StudentPackage),
        student_lesson: applier(HandlerKind::StudentLesson),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
