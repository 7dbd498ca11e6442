// crates/partner-sync-core/tests/common/mod.rs
// ============================================================================
// Module: Sync Engine Test Fixtures
// Description: Recording appliers, publishers, and a wired engine harness.
// ============================================================================
//! ## Overview
//! Shared fixtures for engine, producer, and recovery tests.

#![allow(dead_code, reason = "Not every test binary uses every fixture.")]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use partner_sync_core::ActionKind;
use partner_sync_core::ApplyError;
use partner_sync_core::Appliers;
use partner_sync_core::BatchEvent;
use partner_sync_core::Clock;
use partner_sync_core::CourseRecord;
use partner_sync_core::EventPublisher;
use partner_sync_core::InMemorySyncLogStore;
use partner_sync_core::ManualClock;
use partner_sync_core::NewSyncLog;
use partner_sync_core::NewSyncLogSplit;
use partner_sync_core::PublishError;
use partner_sync_core::Signature;
use partner_sync_core::StaticClassCourseResolver;
use partner_sync_core::StudentPackagePublisher;
use partner_sync_core::SyncApplier;
use partner_sync_core::SyncEngine;
use partner_sync_core::SyncKind;
use partner_sync_core::SyncLogSplit;
use partner_sync_core::SyncLogStore;
use partner_sync_core::SyncSettings;
use partner_sync_core::SyncTelemetry;
use partner_sync_core::Timestamp;

pub const DERIVED_SUBJECT: &str = "SyncJprepStudentPackage.Synced";

pub fn start_time() -> Timestamp {
    Timestamp::from_unix_millis(1_717_200_000_000)
}

// ============================================================================
// SECTION: Appliers
// ============================================================================

/// Applier that records chunk sizes and can fail on a chosen call.
#[derive(Default)]
pub struct RecordingApplier {
    chunk_sizes: Mutex<Vec<usize>>,
    fail_on_call: Mutex<Option<usize>>,
}

impl RecordingApplier {
    pub fn failing_on(call: usize) -> Self {
        let applier = Self::default();
        applier.set_fail_on(Some(call));
        applier
    }

    pub fn set_fail_on(&self, call: Option<usize>) {
        *self.fail_on_call.lock().unwrap() = call;
    }

    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunk_sizes.lock().unwrap().clone()
    }

    pub fn ranges(&self) -> Vec<std::ops::Range<usize>> {
        let mut start = 0;
        self.chunk_sizes()
            .into_iter()
            .map(|size| {
                let range = start .. start + size;
                start += size;
                range
            })
            .collect()
    }

    pub fn reset(&self) {
        self.chunk_sizes.lock().unwrap().clear();
    }
}

#[async_trait]
impl<R> SyncApplier<R> for RecordingApplier
where
    R: Send + Sync,
{
    async fn apply(&self, records: &[R]) -> Result<(), ApplyError> {
        let mut sizes = self.chunk_sizes.lock().unwrap();
        let call = sizes.len();
        if *self.fail_on_call.lock().unwrap() == Some(call) {
            return Err(ApplyError::Failed(format!("chunk {call} rejected")));
        }
        sizes.push(records.len());
        Ok(())
    }
}

/// Applier that never finishes within a test deadline.
pub struct StalledApplier;

#[async_trait]
impl<R> SyncApplier<R> for StalledApplier
where
    R: Send + Sync,
{
    async fn apply(&self, _records: &[R]) -> Result<(), ApplyError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }
}

pub fn uniform_appliers<A>(applier: &Arc<A>) -> Appliers
where
    A: SyncApplier<partner_sync_core::CourseRecord>
        + SyncApplier<partner_sync_core::ClassRecord>
        + SyncApplier<partner_sync_core::LessonRecord>
        + SyncApplier<partner_sync_core::AcademicYearRecord>
        + SyncApplier<partner_sync_core::StudentRecord>
        + SyncApplier<partner_sync_core::StaffRecord>
        + SyncApplier<partner_sync_core::StudentLessonRecord>
        + 'static,
{
    Appliers {
        course: applier.clone(),
        course_academic_year: applier.clone(),
        class: applier.clone(),
        lesson: applier.clone(),
        academic_year: applier.clone(),
        student: applier.clone(),
        staff: applier.clone(),
        class_member: applier.clone(),
        student_package: applier.clone(),
        student_lesson: applier.clone(),
    }
}

// ============================================================================
// SECTION: Publisher and Telemetry
// ============================================================================

/// Publisher that keeps every message in memory.
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<(String, Vec<u8>)>>,
    unavailable: Mutex<bool>,
}

impl RecordingPublisher {
    pub fn messages(&self) -> Vec<(String, Vec<u8>)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn messages_on(&self, subject: &str) -> Vec<Vec<u8>> {
        self.messages().into_iter().filter(|(s, _)| s == subject).map(|(_, bytes)| bytes).collect()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        if *self.unavailable.lock().unwrap() {
            return Err(PublishError::Unavailable("test broker offline".to_string()));
        }
        self.messages.lock().unwrap().push((subject.to_string(), payload));
        Ok(())
    }
}

/// Telemetry sink that keeps batch events.
#[derive(Default)]
pub struct CapturingTelemetry {
    events: Mutex<Vec<BatchEvent>>,
}

impl CapturingTelemetry {
    pub fn events(&self) -> Vec<BatchEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl SyncTelemetry for CapturingTelemetry {
    fn record_batch(&self, event: &BatchEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

pub struct Harness {
    pub store: InMemorySyncLogStore,
    pub clock: ManualClock,
    pub applier: Arc<RecordingApplier>,
    pub publisher: Arc<RecordingPublisher>,
    pub telemetry: Arc<CapturingTelemetry>,
    pub engine: SyncEngine,
}

impl Harness {
    pub fn new(chunk_size: usize) -> Self {
        Self::with_applier(chunk_size, Arc::new(RecordingApplier::default()))
    }

    pub fn with_applier(chunk_size: usize, applier: Arc<RecordingApplier>) -> Self {
        let courses_by_class = BTreeMap::from([
            (10, vec!["c1".to_string()]),
            (20, vec!["c2".to_string(), "c3".to_string()]),
        ]);
        Self::build(chunk_size, applier, courses_by_class)
    }

    pub fn build(
        chunk_size: usize,
        applier: Arc<RecordingApplier>,
        courses_by_class: BTreeMap<i64, Vec<String>>,
    ) -> Self {
        let store = InMemorySyncLogStore::new();
        let clock = ManualClock::new(start_time());
        let publisher = Arc::new(RecordingPublisher::default());
        let telemetry = Arc::new(CapturingTelemetry::default());
        let packages = StudentPackagePublisher::new(
            Arc::new(StaticClassCourseResolver::new(courses_by_class)),
            publisher.clone(),
            DERIVED_SUBJECT,
        )
        .with_retry(partner_sync_core::RetryPolicy::once());
        let engine = SyncEngine::builder(Arc::new(store.clone()))
            .appliers(uniform_appliers(&applier))
            .package_publisher(packages)
            .clock(Arc::new(clock.clone()))
            .telemetry(telemetry.clone())
            .settings(SyncSettings {
                chunk_size,
                ..SyncSettings::default()
            })
            .build()
            .unwrap();
        Self {
            store,
            clock,
            applier,
            publisher,
            telemetry,
            engine,
        }
    }

    /// Creates a sync log and one pending split of `kind`.
    pub async fn seed_split(&self, signature: &str, kind: SyncKind) -> SyncLogSplit {
        let log = self
            .store
            .create_log(
                NewSyncLog {
                    signature: Signature::new(signature),
                    payload: "{}".to_string(),
                },
                self.clock.now(),
            )
            .await
            .unwrap();
        self.store
            .create_split(
                NewSyncLogSplit {
                    log_id: log.log_id,
                    kind,
                    payload: "[]".to_string(),
                },
                self.clock.now(),
            )
            .await
            .unwrap()
    }

    pub async fn split(&self, split: &SyncLogSplit) -> SyncLogSplit {
        self.store.get_split(&split.split_id).await.unwrap().unwrap()
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

pub fn courses(count: usize) -> Vec<CourseRecord> {
    (0 .. count)
        .map(|index| CourseRecord {
            action_kind: ActionKind::Upserted,
            course_id: format!("JPREP_COURSE_{index:09}"),
            course_name: format!("course {index}"),
            status: "active".to_string(),
            academic_year_id: None,
        })
        .collect()
}
