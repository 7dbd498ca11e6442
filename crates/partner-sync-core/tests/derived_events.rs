// crates/partner-sync-core/tests/derived_events.rs
// ============================================================================
// Module: Derived Student Package Tests
// Description: Class-to-course resolution and derived event publishing.
// ============================================================================
//! ## Overview
//! Validates the student package handler publishes resolved packages and
//! fails the chunk when a class cannot be resolved.

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

use std::collections::BTreeMap;
use std::sync::Arc;

use common::DERIVED_SUBJECT;
use common::Harness;
use common::RecordingApplier;
use partner_sync_core::ActionKind;
use partner_sync_core::ChunkError;
use partner_sync_core::ChunkFailure;
use partner_sync_core::DerivedError;
use partner_sync_core::Disposition;
use partner_sync_core::HandleError;
use partner_sync_core::HandlerKind;
use partner_sync_core::Signature;
use partner_sync_core::SplitId;
use partner_sync_core::StudentPackageRecord;
use partner_sync_core::StudentPackageResolved;
use partner_sync_core::StudentRecord;
use partner_sync_core::SyncKind;
use partner_sync_core::SyncStatus;
use partner_sync_core::UserRegistrationEnvelope;
use partner_sync_core::decode_envelope;
use partner_sync_core::encode_envelope;

fn student(id: &str, class_ids: &[i64]) -> StudentRecord {
    StudentRecord {
        action_kind: ActionKind::Upserted,
        student_id: id.to_string(),
        last_name: "Yamada".to_string(),
        given_name: "Taro".to_string(),
        student_divs: vec![1],
        packages: class_ids
            .iter()
            .map(|class_id| StudentPackageRecord {
                class_id: *class_id,
                start_date: 1_700_000_000,
                end_date: 1_730_000_000,
            })
            .collect(),
    }
}

fn registration(signature: &str, split_id: &SplitId, students: Vec<StudentRecord>) -> Vec<u8> {
    encode_envelope(&UserRegistrationEnvelope {
        signature: Signature::new(signature),
        log_id: split_id.clone(),
        students,
        ..UserRegistrationEnvelope::default()
    })
    .unwrap()
}

#[tokio::test]
async fn packages_are_published_with_resolved_course_ids() {
    let harness = Harness::new(10);
    let split = harness.seed_split("sig-pkg", SyncKind::Student).await;
    let payload = registration("sig-pkg", &split.split_id, vec![student("s1", &[10, 20])]);

    let disposition = harness.engine.handle_delivery(HandlerKind::StudentPackage, &payload).await;

    assert_eq!(disposition, Disposition::Ack);
    let messages = harness.publisher.messages_on(DERIVED_SUBJECT);
    assert_eq!(messages.len(), 1);
    let event: StudentPackageResolved = decode_envelope(&messages[0]).unwrap();
    assert_eq!(event.signature.as_str(), "sig-pkg");
    assert_eq!(event.log_id, split.split_id);
    let by_class: BTreeMap<i64, Vec<String>> =
        event.packages.iter().map(|pkg| (pkg.class_id, pkg.course_ids.clone())).collect();
    assert_eq!(by_class.len(), 2);
    assert_eq!(by_class[&10], vec!["c1".to_string()]);
    assert_eq!(by_class[&20], vec!["c2".to_string(), "c3".to_string()]);
    assert!(event.packages.iter().all(|package| package.student_id == "s1"));
    assert_eq!(harness.split(&split).await.status, SyncStatus::Success);
}

#[tokio::test]
async fn one_event_is_published_per_chunk() {
    let harness = Harness::new(2);
    let split = harness.seed_split("sig-chunks", SyncKind::Student).await;
    let students = vec![student("s1", &[10]), student("s2", &[20]), student("s3", &[10])];

    harness
        .engine
        .handle(HandlerKind::StudentPackage, &registration("sig-chunks", &split.split_id, students))
        .await
        .unwrap();

    let events: Vec<StudentPackageResolved> = harness
        .publisher
        .messages_on(DERIVED_SUBJECT)
        .iter()
        .map(|bytes| decode_envelope(bytes).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].packages.len(), 2);
    assert_eq!(events[1].packages.len(), 1);
    assert_eq!(events[1].packages[0].student_id, "s3");
}

#[tokio::test]
async fn unresolvable_class_fails_the_chunk() {
    let harness = Harness::new(10);
    let split = harness.seed_split("sig-missing", SyncKind::Student).await;
    let payload = registration("sig-missing", &split.split_id, vec![student("s1", &[10, 99])]);

    let err = harness.engine.handle(HandlerKind::StudentPackage, &payload).await.unwrap_err();

    assert!(matches!(
        err,
        HandleError::Dispatch(ChunkError::Failed {
            source: ChunkFailure::Derived(DerivedError::MissingClass(99)),
            ..
        })
    ));
    assert_eq!(err.disposition(), Disposition::Redeliver);
    assert!(harness.publisher.messages_on(DERIVED_SUBJECT).is_empty());
    assert_eq!(harness.split(&split).await.status, SyncStatus::Failed);
}

#[tokio::test]
async fn students_without_packages_publish_nothing() {
    let harness = Harness::new(10);
    let split = harness.seed_split("sig-none", SyncKind::Student).await;
    let payload = registration("sig-none", &split.split_id, vec![student("s1", &[])]);

    let disposition = harness.engine.handle_delivery(HandlerKind::StudentPackage, &payload).await;
    assert_eq!(disposition, Disposition::Ack);
    assert!(harness.publisher.messages().is_empty());
}

#[tokio::test]
async fn class_member_projection_does_not_publish_packages() {
    let harness = Harness::build(10, Arc::new(RecordingApplier::default()), BTreeMap::new());
    let split = harness.seed_split("sig-members", SyncKind::Student).await;
    let payload = registration("sig-members", &split.split_id, vec![student("s1", &[10])]);

    let disposition = harness.engine.handle_delivery(HandlerKind::ClassMember, &payload).await;
    assert_eq!(disposition, Disposition::Ack);
    assert!(harness.publisher.messages().is_empty());
}

#[tokio::test]
async fn publish_outage_is_retriable() {
    let harness = Harness::new(10);
    harness.publisher.set_unavailable(true);
    let split = harness.seed_split("sig-offline", SyncKind::Student).await;
    let payload = registration("sig-offline", &split.split_id, vec![student("s1", &[10])]);

    let err = harness.engine.handle(HandlerKind::StudentPackage, &payload).await.unwrap_err();
    assert!(matches!(
        err,
        HandleError::Dispatch(ChunkError::Failed {
            source: ChunkFailure::Derived(DerivedError::Publish(_)),
            ..
        })
    ));
    assert_eq!(err.disposition(), Disposition::Redeliver);
}
