// crates/partner-sync-core/tests/handlers.rs
// ============================================================================
// Module: Handler State Machine Tests
// Description: Decode, staleness, chunk dispatch, and split status outcomes.
// ============================================================================
//! ## Overview
//! Drives every handler kind through the engine against the in-memory store.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use common::Harness;
use common::RecordingApplier;
use common::StalledApplier;
use common::courses;
use common::uniform_appliers;
use partner_sync_core::ActionKind;
use partner_sync_core::BatchOutcome;
use partner_sync_core::ChunkError;
use partner_sync_core::Disposition;
use partner_sync_core::HandleError;
use partner_sync_core::HandleOutcome;
use partner_sync_core::HandlerKind;
use partner_sync_core::InMemorySyncLogStore;
use partner_sync_core::MasterRegistrationEnvelope;
use partner_sync_core::NewSyncLog;
use partner_sync_core::NewSyncLogSplit;
use partner_sync_core::Signature;
use partner_sync_core::SplitId;
use partner_sync_core::StaticClassCourseResolver;
use partner_sync_core::StudentLessonRecord;
use partner_sync_core::StudentPackagePublisher;
use partner_sync_core::SyncEngine;
use partner_sync_core::StoreError;
use partner_sync_core::SyncKind;
use partner_sync_core::SyncLog;
use partner_sync_core::SyncLogId;
use partner_sync_core::SyncLogSplit;
use partner_sync_core::SyncLogStore;
use partner_sync_core::SyncSettings;
use partner_sync_core::SyncStatus;
use partner_sync_core::Timestamp;
use partner_sync_core::UserCourseEnvelope;
use partner_sync_core::encode_envelope;

/// Store wrapper that records every status write in order.
struct StatusJournal {
    inner: InMemorySyncLogStore,
    writes: Mutex<Vec<SyncStatus>>,
}

impl StatusJournal {
    fn over(inner: InMemorySyncLogStore) -> Self {
        Self {
            inner,
            writes: Mutex::default(),
        }
    }

    fn writes(&self) -> Vec<SyncStatus> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl SyncLogStore for StatusJournal {
    async fn create_log(&self, log: NewSyncLog, now: Timestamp) -> Result<SyncLog, StoreError> {
        self.inner.create_log(log, now).await
    }

    async fn create_split(
        &self,
        split: NewSyncLogSplit,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError> {
        self.inner.create_split(split, now).await
    }

    async fn get_split(&self, split_id: &SplitId) -> Result<Option<SyncLogSplit>, StoreError> {
        self.inner.get_split(split_id).await
    }

    async fn update_split_status(
        &self,
        split_id: &SplitId,
        status: SyncStatus,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError> {
        self.writes.lock().unwrap().push(status);
        self.inner.update_split_status(split_id, status, now).await
    }

    async fn abandon_split(
        &self,
        split_id: &SplitId,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError> {
        self.inner.abandon_split(split_id, now).await
    }

    async fn increment_retry(
        &self,
        split_id: &SplitId,
        now: Timestamp,
    ) -> Result<SyncLogSplit, StoreError> {
        self.inner.increment_retry(split_id, now).await
    }

    async fn get_log_by_signature(
        &self,
        signature: &Signature,
    ) -> Result<Option<SyncLog>, StoreError> {
        self.inner.get_log_by_signature(signature).await
    }

    async fn get_log(&self, log_id: &SyncLogId) -> Result<Option<SyncLog>, StoreError> {
        self.inner.get_log(log_id).await
    }

    async fn touch_log(&self, log_id: &SyncLogId, now: Timestamp) -> Result<(), StoreError> {
        self.inner.touch_log(log_id, now).await
    }

    async fn splits_by_signature(
        &self,
        signature: &Signature,
    ) -> Result<Vec<SyncLogSplit>, StoreError> {
        self.inner.splits_by_signature(signature).await
    }

    async fn splits_created_between(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<SyncLogSplit>, StoreError> {
        self.inner.splits_created_between(from, to).await
    }
}

/// Builds an engine over `harness`'s tables that journals status writes.
fn journaled_engine(harness: &Harness) -> (SyncEngine, Arc<StatusJournal>) {
    let journal = Arc::new(StatusJournal::over(harness.store.clone()));
    let engine = SyncEngine::builder(journal.clone())
        .appliers(uniform_appliers(&harness.applier))
        .package_publisher(StudentPackagePublisher::new(
            Arc::new(StaticClassCourseResolver::default()),
            harness.publisher.clone(),
            common::DERIVED_SUBJECT,
        ))
        .clock(Arc::new(harness.clock.clone()))
        .settings(SyncSettings {
            chunk_size: 3,
            ..SyncSettings::default()
        })
        .build()
        .unwrap();
    (engine, journal)
}

fn course_envelope(signature: &str, split_id: &SplitId, count: usize) -> Vec<u8> {
    encode_envelope(&MasterRegistrationEnvelope {
        signature: Signature::new(signature),
        log_id: split_id.clone(),
        courses: courses(count),
        ..MasterRegistrationEnvelope::default()
    })
    .unwrap()
}

fn student_lesson_envelope(signature: &str, split_id: &SplitId) -> Vec<u8> {
    encode_envelope(&UserCourseEnvelope {
        signature: Signature::new(signature),
        log_id: split_id.clone(),
        student_lessons: vec![StudentLessonRecord {
            action_kind: ActionKind::Upserted,
            student_id: "student-1".to_string(),
            lesson_ids: vec!["lesson-1".to_string()],
        }],
        ..UserCourseEnvelope::default()
    })
    .unwrap()
}

#[tokio::test]
async fn seven_courses_apply_in_three_chunks_and_succeed() {
    let harness = Harness::new(3);
    let split = harness.seed_split("sig-7", SyncKind::Course).await;

    let outcome = harness
        .engine
        .handle(HandlerKind::Course, &course_envelope("sig-7", &split.split_id, 7))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        HandleOutcome::Applied {
            record_count: 7,
            chunk_count: 3,
        }
    );
    assert_eq!(harness.applier.ranges(), vec![0 .. 3, 3 .. 6, 6 .. 7]);
    assert_eq!(harness.split(&split).await.status, SyncStatus::Success);
}

#[tokio::test]
async fn malformed_bytes_are_never_redelivered() {
    let harness = Harness::new(3);
    for kind in HandlerKind::ALL {
        let disposition = harness.engine.handle_delivery(kind, b"\xff\xfe not an envelope").await;
        assert_eq!(disposition, Disposition::Terminate, "handler {kind}");
    }
    assert!(harness.applier.chunk_sizes().is_empty());
}

#[tokio::test]
async fn failing_chunk_stops_dispatch_and_requests_redelivery() {
    let harness = Harness::with_applier(3, Arc::new(RecordingApplier::failing_on(1)));
    let split = harness.seed_split("sig-fail", SyncKind::Course).await;

    let err = harness
        .engine
        .handle(HandlerKind::Course, &course_envelope("sig-fail", &split.split_id, 7))
        .await
        .unwrap_err();

    match &err {
        HandleError::Dispatch(ChunkError::Failed {
            range, ..
        }) => assert_eq!(*range, 3 .. 6),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.disposition(), Disposition::Redeliver);
    assert_eq!(harness.applier.chunk_sizes(), vec![3]);
    assert_eq!(harness.split(&split).await.status, SyncStatus::Failed);
}

#[tokio::test]
async fn redelivery_after_failure_leaves_retry_budget_alone() {
    let harness = Harness::with_applier(3, Arc::new(RecordingApplier::failing_on(0)));
    let split = harness.seed_split("sig-retry", SyncKind::Course).await;
    let payload = course_envelope("sig-retry", &split.split_id, 4);

    assert_eq!(
        harness.engine.handle_delivery(HandlerKind::Course, &payload).await,
        Disposition::Redeliver
    );
    harness.applier.set_fail_on(None);
    harness.applier.reset();
    let disposition = harness.engine.handle_delivery(HandlerKind::Course, &payload).await;
    assert_eq!(disposition, Disposition::Ack);

    let stored = harness.split(&split).await;
    assert_eq!(stored.status, SyncStatus::Success);
    assert_eq!(stored.retry_times, 0);
    assert_eq!(harness.applier.ranges(), vec![0 .. 3, 3 .. 4]);
}

#[tokio::test]
async fn student_lessons_older_than_window_are_skipped() {
    let harness = Harness::new(3);
    let split = harness.seed_split("sig-stale", SyncKind::StudentLessons).await;
    harness.clock.advance(Duration::from_secs(61 * 60));

    let outcome = harness
        .engine
        .handle(HandlerKind::StudentLesson, &student_lesson_envelope("sig-stale", &split.split_id))
        .await
        .unwrap();

    assert_eq!(outcome, HandleOutcome::SkippedStale);
    assert!(harness.applier.chunk_sizes().is_empty());
    assert_eq!(harness.split(&split).await.status, SyncStatus::Pending);
}

#[tokio::test]
async fn student_lessons_inside_window_are_applied() {
    let harness = Harness::new(3);
    let split = harness.seed_split("sig-fresh", SyncKind::StudentLessons).await;
    harness.clock.advance(Duration::from_secs(59 * 60));

    let outcome = harness
        .engine
        .handle(HandlerKind::StudentLesson, &student_lesson_envelope("sig-fresh", &split.split_id))
        .await
        .unwrap();

    assert!(matches!(outcome, HandleOutcome::Applied { .. }));
    assert_eq!(harness.applier.chunk_sizes(), vec![1]);
    assert_eq!(harness.split(&split).await.status, SyncStatus::Success);
}

#[tokio::test]
async fn staleness_only_applies_to_student_lessons() {
    let harness = Harness::new(3);
    let split = harness.seed_split("sig-old-course", SyncKind::Course).await;
    harness.clock.advance(Duration::from_secs(6 * 60 * 60));

    let outcome = harness
        .engine
        .handle(HandlerKind::Course, &course_envelope("sig-old-course", &split.split_id, 2))
        .await
        .unwrap();

    assert!(matches!(outcome, HandleOutcome::Applied { .. }));
}

#[tokio::test]
async fn student_lessons_without_a_log_are_redelivered() {
    let harness = Harness::new(3);
    let err = harness
        .engine
        .handle(
            HandlerKind::StudentLesson,
            &student_lesson_envelope("sig-unknown", &SplitId::new("x")),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HandleError::Staleness(_)));
    assert_eq!(err.disposition(), Disposition::Redeliver);
}

#[tokio::test]
async fn envelope_without_records_for_handler_leaves_split_alone() {
    let harness = Harness::new(3);
    let split = harness.seed_split("sig-lessons", SyncKind::Lesson).await;

    let outcome = harness
        .engine
        .handle(HandlerKind::Class, &course_envelope("sig-lessons", &split.split_id, 3))
        .await
        .unwrap();

    assert_eq!(outcome, HandleOutcome::SkippedEmpty);
    assert_eq!(harness.split(&split).await.status, SyncStatus::Pending);
}

#[tokio::test]
async fn missing_split_id_applies_without_tracking() {
    let harness = Harness::new(3);
    let outcome = harness
        .engine
        .handle(HandlerKind::Course, &course_envelope("sig-untracked", &SplitId::default(), 2))
        .await
        .unwrap();
    assert!(matches!(outcome, HandleOutcome::Applied { .. }));
}

#[tokio::test]
async fn unknown_split_id_is_redelivered() {
    let harness = Harness::new(3);
    let err = harness
        .engine
        .handle(HandlerKind::Course, &course_envelope("sig", &SplitId::new("nope"), 2))
        .await
        .unwrap_err();
    assert!(matches!(err, HandleError::Status(_)));
    assert_eq!(err.disposition(), Disposition::Redeliver);
    assert!(harness.applier.chunk_sizes().is_empty());
}

#[tokio::test]
async fn successful_attempt_writes_processing_then_success() {
    let harness = Harness::new(3);
    let split = harness.seed_split("sig-ok", SyncKind::Course).await;
    let (engine, journal) = journaled_engine(&harness);

    let payload = course_envelope("sig-ok", &split.split_id, 4);
    assert_eq!(engine.handle_delivery(HandlerKind::Course, &payload).await, Disposition::Ack);

    assert_eq!(journal.writes(), vec![SyncStatus::Processing, SyncStatus::Success]);
    assert_eq!(harness.split(&split).await.status, SyncStatus::Success);
}

#[tokio::test]
async fn failed_attempt_writes_processing_then_failed() {
    let harness = Harness::with_applier(3, Arc::new(RecordingApplier::failing_on(0)));
    let split = harness.seed_split("sig-mono", SyncKind::Course).await;
    let (engine, journal) = journaled_engine(&harness);

    let payload = course_envelope("sig-mono", &split.split_id, 1);
    let disposition = engine.handle_delivery(HandlerKind::Course, &payload).await;
    assert_eq!(disposition, Disposition::Redeliver);

    assert_eq!(journal.writes(), vec![SyncStatus::Processing, SyncStatus::Failed]);
    let stored = harness.split(&split).await;
    assert_eq!(stored.status, SyncStatus::Failed);
    assert_eq!(stored.retry_times, 0);
}

#[tokio::test]
async fn each_delivery_emits_one_batch_event() {
    let harness = Harness::new(3);
    let split = harness.seed_split("sig-telemetry", SyncKind::Course).await;
    harness
        .engine
        .handle(HandlerKind::Course, &course_envelope("sig-telemetry", &split.split_id, 4))
        .await
        .unwrap();
    let _ = harness.engine.handle(HandlerKind::Course, b"{").await;

    let events = harness.telemetry.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].outcome, BatchOutcome::Applied);
    assert_eq!(events[0].handler, "sync-course");
    assert_eq!(events[0].signature.as_deref(), Some("sig-telemetry"));
    assert_eq!(events[0].chunk_count, 2);
    assert_eq!(events[1].outcome, BatchOutcome::Terminated);
    assert_eq!(events[1].error_kind, Some("decode"));
    assert_eq!(events[1].signature, None);
}

#[tokio::test(start_paused = true)]
async fn handler_deadline_requests_redelivery() {
    let store = InMemorySyncLogStore::new();
    let publisher = Arc::new(common::RecordingPublisher::default());
    let engine = SyncEngine::builder(Arc::new(store))
        .appliers(uniform_appliers(&Arc::new(StalledApplier)))
        .package_publisher(StudentPackagePublisher::new(
            Arc::new(StaticClassCourseResolver::default()),
            publisher,
            common::DERIVED_SUBJECT,
        ))
        .settings(SyncSettings {
            chunk_size: 3,
            handler_timeout: Duration::from_secs(30),
            ..SyncSettings::default()
        })
        .build()
        .unwrap();

    let err = engine
        .handle(HandlerKind::Course, &course_envelope("sig-slow", &SplitId::default(), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, HandleError::Timeout(_)));
    assert_eq!(err.disposition(), Disposition::Redeliver);
}
