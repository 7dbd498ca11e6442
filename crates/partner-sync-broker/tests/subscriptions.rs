// crates/partner-sync-broker/tests/subscriptions.rs
// ============================================================================
// Module: Subscription Manager Tests
// Description: Worker loops over the in-memory broker.
// Purpose: Validate bind fail-fast, ack/nak/term mapping, redelivery limits,
//          and worker shutdown.
// ============================================================================

//! ## Overview
//! End-to-end tests that publish partner batches into [`InMemoryBroker`] and
//! let [`SubscriptionManager`] drive a real [`SyncEngine`].

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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use partner_sync_broker::ConsumerPolicy;
use partner_sync_broker::InMemoryBroker;
use partner_sync_broker::SubscriptionError;
use partner_sync_broker::SubscriptionManager;
use partner_sync_broker::SubscriptionSpec;
use partner_sync_broker::TransportError;
use partner_sync_core::ActionKind;
use partner_sync_core::ApplyError;
use partner_sync_core::Appliers;
use partner_sync_core::BatchEvent;
use partner_sync_core::BatchPublisher;
use partner_sync_core::CourseRecord;
use partner_sync_core::EngineEvent;
use partner_sync_core::EventPublisher;
use partner_sync_core::InMemorySyncLogStore;
use partner_sync_core::InboundSubject;
use partner_sync_core::InboundSubjects;
use partner_sync_core::PartnerBatch;
use partner_sync_core::RetryPolicy;
use partner_sync_core::Signature;
use partner_sync_core::StaffRecord;
use partner_sync_core::StaticClassCourseResolver;
use partner_sync_core::StudentPackagePublisher;
use partner_sync_core::SyncApplier;
use partner_sync_core::SyncEngine;
use partner_sync_core::SyncLogStore;
use partner_sync_core::SyncSettings;
use partner_sync_core::SyncStatus;
use partner_sync_core::SyncTelemetry;
use partner_sync_core::SystemClock;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Applier that counts records and can be switched to fail.
#[derive(Default)]
struct CountingApplier {
    records: AtomicUsize,
    failing: AtomicBool,
}

#[async_trait]
impl<R> SyncApplier<R> for CountingApplier
where
    R: Send + Sync,
{
    async fn apply(&self, records: &[R]) -> Result<(), ApplyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApplyError::Failed("downstream offline".to_string()));
        }
        self.records.fetch_add(records.len(), Ordering::SeqCst);
        Ok(())
    }
}

/// Telemetry sink that keeps engine events.
#[derive(Default)]
struct EngineEvents {
    events: Mutex<Vec<EngineEvent>>,
}

impl EngineEvents {
    fn named(&self, name: &str) -> usize {
        self.events.lock().unwrap().iter().filter(|event| event.event == name).count()
    }
}

impl SyncTelemetry for EngineEvents {
    fn record_batch(&self, _event: &BatchEvent) {}

    fn record_engine(&self, event: &EngineEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

struct Fixture {
    broker: InMemoryBroker,
    store: InMemorySyncLogStore,
    applier: Arc<CountingApplier>,
    events: Arc<EngineEvents>,
    engine: Arc<SyncEngine>,
}

impl Fixture {
    fn new() -> Self {
        let broker = InMemoryBroker::new();
        let store = InMemorySyncLogStore::new();
        let applier = Arc::new(CountingApplier::default());
        let events = Arc::new(EngineEvents::default());
        let appliers = Appliers {
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
        };
        let packages = StudentPackagePublisher::new(
            Arc::new(StaticClassCourseResolver::default()),
            Arc::new(broker.clone()),
            "SyncJprepStudentPackage.Synced",
        );
        let engine = SyncEngine::builder(Arc::new(store.clone()))
            .appliers(appliers)
            .package_publisher(packages)
            .telemetry(events.clone())
            .settings(SyncSettings {
                chunk_size: 3,
                ..SyncSettings::default()
            })
            .build()
            .unwrap();
        Self {
            broker,
            store,
            applier,
            events,
            engine: Arc::new(engine),
        }
    }

    fn manager(&self, policy: ConsumerPolicy) -> SubscriptionManager {
        SubscriptionManager::new(
            Arc::new(self.broker.clone()),
            Arc::clone(&self.engine),
            policy,
            SubscriptionSpec::for_handlers(&InboundSubjects::default()),
        )
    }

    fn producer(&self) -> BatchPublisher {
        BatchPublisher::new(
            Arc::new(self.store.clone()),
            Arc::new(self.broker.clone()),
            Arc::new(SystemClock),
        )
        .with_retry(RetryPolicy::once())
    }

    async fn split_status(&self, signature: &str) -> SyncStatus {
        let splits = self.store.splits_by_signature(&Signature::new(signature)).await.unwrap();
        assert_eq!(splits.len(), 1);
        splits[0].status
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn courses(count: usize) -> Vec<CourseRecord> {
    (0 .. count)
        .map(|index| CourseRecord {
            action_kind: ActionKind::Upserted,
            course_id: format!("course-{index}"),
            course_name: format!("Course {index}"),
            status: "active".to_string(),
            academic_year_id: None,
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn published_batch_is_applied_and_acked_on_every_durable() {
    let fixture = Fixture::new();
    let running = fixture.manager(ConsumerPolicy::default()).start().await.unwrap();
    assert_eq!(running.len(), 10);

    fixture
        .producer()
        .publish(PartnerBatch {
            signature: Signature::new("sig-courses"),
            courses: courses(7),
            ..PartnerBatch::default()
        })
        .await
        .unwrap();

    // Five durables share the master registration subject.
    wait_for(|| fixture.broker.settled() == 5).await;
    assert_eq!(fixture.broker.acked("durable-sync-course"), 1);
    assert_eq!(fixture.broker.acked("durable-sync-class"), 1);
    assert!(fixture.broker.given_up().is_empty());
    assert_eq!(fixture.split_status("sig-courses").await, SyncStatus::Success);
    // Course and course-academic handlers both apply the course records.
    assert_eq!(fixture.applier.records.load(Ordering::SeqCst), 14);

    fixture.broker.close();
    running.wait().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn malformed_message_is_terminated_not_redelivered() {
    let fixture = Fixture::new();
    let running = fixture.manager(ConsumerPolicy::default()).start().await.unwrap();
    let subject = InboundSubjects::default().name(InboundSubject::UserCourse).to_string();

    fixture.broker.publish(&subject, b"{not json".to_vec()).await.unwrap();

    wait_for(|| fixture.broker.settled() == 1).await;
    let terminated = fixture.broker.terminated();
    assert_eq!(terminated.len(), 1);
    assert_eq!(terminated[0].durable, "durable-sync-user-course");
    assert_eq!(terminated[0].attempts, 1);
    assert!(fixture.broker.given_up().is_empty());

    fixture.broker.close();
    running.wait().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_apply_is_redelivered_up_to_max_deliver() {
    let fixture = Fixture::new();
    fixture.applier.failing.store(true, Ordering::SeqCst);
    let policy = ConsumerPolicy {
        max_deliver: 3,
        ..ConsumerPolicy::default()
    };
    let running = fixture.manager(policy).start().await.unwrap();

    fixture
        .producer()
        .publish(PartnerBatch {
            signature: Signature::new("sig-staff"),
            staffs: vec![StaffRecord {
                action_kind: ActionKind::Upserted,
                staff_id: "staff-1".to_string(),
                name: "Sato".to_string(),
            }],
            ..PartnerBatch::default()
        })
        .await
        .unwrap();

    // Student, class-member, and package durables see no staff and ack.
    wait_for(|| fixture.broker.settled() == 4).await;
    let given_up = fixture.broker.given_up();
    assert_eq!(given_up.len(), 1);
    assert_eq!(given_up[0].durable, "durable-sync-staff");
    assert_eq!(given_up[0].attempts, 3);

    let splits = fixture.store.splits_by_signature(&Signature::new("sig-staff")).await.unwrap();
    assert_eq!(splits[0].status, SyncStatus::Failed);
    assert_eq!(splits[0].retry_times, 0);

    fixture.broker.close();
    running.wait().await;
}

#[tokio::test]
async fn bind_failure_aborts_startup() {
    let fixture = Fixture::new();
    fixture.broker.fail_bind("durable-sync-staff");
    let result = fixture.manager(ConsumerPolicy::default()).start().await;
    match result {
        Err(SubscriptionError::Bind(TransportError::Bind {
            durable,
            ..
        })) => assert_eq!(durable, "durable-sync-staff"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("startup should fail"),
    }
    assert_eq!(fixture.events.named("subscription_bound"), 6);
}

#[tokio::test]
async fn duplicate_durables_and_zero_concurrency_are_rejected() {
    let fixture = Fixture::new();
    let mut specs = SubscriptionSpec::for_handlers(&InboundSubjects::default());
    specs[2].durable = specs[0].durable.clone();
    let duplicate = SubscriptionManager::new(
        Arc::new(fixture.broker.clone()),
        Arc::clone(&fixture.engine),
        ConsumerPolicy::default(),
        specs,
    )
    .start()
    .await;
    assert!(matches!(duplicate, Err(SubscriptionError::DuplicateDurable(_))));

    let policy = ConsumerPolicy {
        max_in_flight: 0,
        ..ConsumerPolicy::default()
    };
    let result = fixture.manager(policy).start().await;
    assert!(matches!(result, Err(SubscriptionError::InvalidConcurrency)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn closing_the_broker_stops_every_worker() {
    let fixture = Fixture::new();
    let running = fixture.manager(ConsumerPolicy::default()).start().await.unwrap();
    fixture.broker.close();
    tokio::time::timeout(Duration::from_secs(5), running.wait()).await.unwrap();
    assert_eq!(fixture.events.named("subscription_bound"), 10);
    assert_eq!(fixture.events.named("worker_stopped"), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_signal_stops_workers_on_an_open_broker() {
    let fixture = Fixture::new();
    let running = fixture.manager(ConsumerPolicy::default()).start().await.unwrap();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let serving = tokio::spawn(running.run_until(async move {
        let _ = stopped.await;
    }));
    stop.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), serving).await.unwrap().unwrap();
    // Aborted workers never reach their drain step.
    assert_eq!(fixture.events.named("worker_stopped"), 0);
}
