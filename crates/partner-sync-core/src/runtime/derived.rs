// crates/partner-sync-core/src/runtime/derived.rs
// ============================================================================
// Module: Student Package Publisher
// Description: Resolves package class ids and republishes derived events.
// Purpose: Feed downstream consumers packages keyed by current course ids.
// Dependencies: crate::interfaces, crate::core::envelope
// ============================================================================

//! ## Overview
//! After a chunk of student records is applied, every package class id in the
//! chunk is resolved to the class's current course ids and one
//! [`StudentPackageResolved`] event is published for the chunk.
//! Invariants:
//! - An event never references a class id the resolver did not return.
//! - Chunks without packages publish nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::core::EnvelopeError;
use crate::core::ResolvedPackage;
use crate::core::Signature;
use crate::core::SplitId;
use crate::core::StudentPackageResolved;
use crate::core::StudentRecord;
use crate::core::encode_envelope;
use crate::interfaces::ClassCourseResolver;
use crate::interfaces::EventPublisher;
use crate::interfaces::PublishError;
use crate::interfaces::ResolveError;
use crate::runtime::retry::RetryPolicy;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Derived event errors; all are retriable.
#[derive(Debug, Error)]
pub enum DerivedError {
    /// Resolver failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// A referenced class has no course mapping.
    #[error("class {0} has no course mapping")]
    MissingClass(i64),
    /// Event could not be encoded.
    #[error(transparent)]
    Encode(#[from] EnvelopeError),
    /// Event could not be published.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Builds the derived event for `students` from a class-to-course map.
///
/// Entries follow student order, then package order.
///
/// # Errors
///
/// Returns [`DerivedError::MissingClass`] for the first unresolved class id.
pub fn resolve_packages(
    signature: &Signature,
    log_id: &SplitId,
    students: &[StudentRecord],
    courses_by_class: &BTreeMap<i64, Vec<String>>,
) -> Result<StudentPackageResolved, DerivedError> {
    let mut packages = Vec::new();
    for student in students {
        for package in &student.packages {
            let course_ids = courses_by_class
                .get(&package.class_id)
                .ok_or(DerivedError::MissingClass(package.class_id))?;
            packages.push(ResolvedPackage {
                action_kind: student.action_kind,
                student_id: student.student_id.clone(),
                class_id: package.class_id,
                course_ids: course_ids.clone(),
                start_date: package.start_date,
                end_date: package.end_date,
            });
        }
    }
    Ok(StudentPackageResolved {
        signature: signature.clone(),
        log_id: log_id.clone(),
        packages,
    })
}

/// Returns the distinct class ids referenced by `students`, ascending.
fn referenced_classes(students: &[StudentRecord]) -> Vec<i64> {
    let classes: BTreeSet<i64> = students
        .iter()
        .flat_map(|student| student.packages.iter().map(|package| package.class_id))
        .collect();
    classes.into_iter().collect()
}

// ============================================================================
// SECTION: Publisher
// ============================================================================

/// Resolves and publishes student package events.
#[derive(Clone)]
pub struct StudentPackagePublisher {
    /// Class to course lookup.
    resolver: Arc<dyn ClassCourseResolver>,
    /// Broker publisher.
    publisher: Arc<dyn EventPublisher>,
    /// Derived event subject.
    subject: String,
    /// Publish retry policy.
    retry: RetryPolicy,
}

impl StudentPackagePublisher {
    /// Creates a publisher for `subject`.
    #[must_use]
    pub fn new(
        resolver: Arc<dyn ClassCourseResolver>,
        publisher: Arc<dyn EventPublisher>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            publisher,
            subject: subject.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the publish retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the derived event subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Resolves and publishes the event for one applied chunk.
    ///
    /// Returns `None` when the chunk holds no packages.
    ///
    /// # Errors
    ///
    /// Returns [`DerivedError`] when resolution, encoding, or publishing fails.
    pub async fn publish_chunk(
        &self,
        signature: &Signature,
        log_id: &SplitId,
        students: &[StudentRecord],
    ) -> Result<Option<StudentPackageResolved>, DerivedError> {
        let class_ids = referenced_classes(students);
        if class_ids.is_empty() {
            return Ok(None);
        }
        let courses_by_class = self.resolver.course_ids_by_class(&class_ids).await?;
        let event = resolve_packages(signature, log_id, students, &courses_by_class)?;
        let payload = encode_envelope(&event)?;
        let publisher = &self.publisher;
        let subject = self.subject.as_str();
        self.retry.run(move |_| publisher.publish(subject, payload.clone())).await?;
        Ok(Some(event))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
