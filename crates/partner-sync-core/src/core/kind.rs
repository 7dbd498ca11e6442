// crates/partner-sync-core/src/core/kind.rs
// ============================================================================
// Module: Partner Sync Kinds
// Description: Domain categories for split tracking and handler routing.
// Purpose: Map inbound subjects, handlers, and persisted split kinds.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Two related enumerations live here. [`SyncKind`] is the persisted kind of a
//! split row. [`HandlerKind`] is the consumer that processes a delivery; several
//! handlers may project the same split kind (for example class membership and
//! student packages both consume student records).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Split Kind
// ============================================================================

/// Persisted kind of a `partner_sync_data_log_split` row.
///
/// # Invariants
/// - Labels returned by [`SyncKind::as_str`] are stable storage values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    /// Student master records.
    Student,
    /// Staff master records.
    Staff,
    /// Course master records.
    Course,
    /// Class master records.
    Class,
    /// Lesson master records.
    Lesson,
    /// Academic year master records.
    AcademicYear,
    /// Student to lesson assignments.
    StudentLessons,
}

impl SyncKind {
    /// All split kinds in storage order.
    pub const ALL: [Self; 7] = [
        Self::Student,
        Self::Staff,
        Self::Course,
        Self::Class,
        Self::Lesson,
        Self::AcademicYear,
        Self::StudentLessons,
    ];

    /// Returns the stable storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Staff => "staff",
            Self::Course => "course",
            Self::Class => "class",
            Self::Lesson => "lesson",
            Self::AcademicYear => "academic_year",
            Self::StudentLessons => "student_lessons",
        }
    }

    /// Parses a storage label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == label)
    }

    /// Returns the inbound subject that carries this kind.
    #[must_use]
    pub const fn inbound(self) -> InboundSubject {
        match self {
            Self::Student | Self::Staff => InboundSubject::UserRegistration,
            Self::Course | Self::Class | Self::Lesson | Self::AcademicYear => {
                InboundSubject::MasterRegistration
            }
            Self::StudentLessons => InboundSubject::UserCourse,
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Inbound Subjects
// ============================================================================

/// Logical inbound stream subjects published by the partner ingress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundSubject {
    /// Courses, classes, lessons, and academic years.
    MasterRegistration,
    /// Students and staff.
    UserRegistration,
    /// Student lesson assignments.
    UserCourse,
}

impl InboundSubject {
    /// Returns a stable label for the subject.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MasterRegistration => "master_registration",
            Self::UserRegistration => "user_registration",
            Self::UserCourse => "user_course",
        }
    }
}

// ============================================================================
// SECTION: Handler Kind
// ============================================================================

/// Consumer that processes a delivered envelope.
///
/// # Invariants
/// - Each handler reads exactly one record array from its envelope.
/// - [`HandlerKind::label`] values are unique and stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// Course upserts and deletes.
    Course,
    /// Course to academic year association.
    CourseAcademicYear,
    /// Class upserts and deletes.
    Class,
    /// Live lesson upserts and deletes.
    Lesson,
    /// Academic year upserts and deletes.
    AcademicYear,
    /// Student account upserts and deletes.
    Student,
    /// Staff account upserts and deletes.
    Staff,
    /// Class membership projection of student records.
    ClassMember,
    /// Student package projection of student records.
    StudentPackage,
    /// Student lesson assignments.
    StudentLesson,
}

impl HandlerKind {
    /// All handler kinds.
    pub const ALL: [Self; 10] = [
        Self::Course,
        Self::CourseAcademicYear,
        Self::Class,
        Self::Lesson,
        Self::AcademicYear,
        Self::Student,
        Self::Staff,
        Self::ClassMember,
        Self::StudentPackage,
        Self::StudentLesson,
    ];

    /// Returns the stable handler label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Course => "sync-course",
            Self::CourseAcademicYear => "sync-course-academic",
            Self::Class => "sync-class",
            Self::Lesson => "sync-live-lesson",
            Self::AcademicYear => "sync-academic-year",
            Self::Student => "sync-student",
            Self::Staff => "sync-staff",
            Self::ClassMember => "sync-class-member",
            Self::StudentPackage => "sync-student-package",
            Self::StudentLesson => "sync-user-course",
        }
    }

    /// Parses a handler label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.label() == label)
    }

    /// Returns the split kind whose status this handler drives.
    #[must_use]
    pub const fn split_kind(self) -> SyncKind {
        match self {
            Self::Course | Self::CourseAcademicYear => SyncKind::Course,
            Self::Class => SyncKind::Class,
            Self::Lesson => SyncKind::Lesson,
            Self::AcademicYear => SyncKind::AcademicYear,
            Self::Student | Self::ClassMember | Self::StudentPackage => SyncKind::Student,
            Self::Staff => SyncKind::Staff,
            Self::StudentLesson => SyncKind::StudentLessons,
        }
    }

    /// Returns the inbound subject this handler consumes.
    #[must_use]
    pub const fn inbound(self) -> InboundSubject {
        self.split_kind().inbound()
    }

    /// Returns true when the handler filters stale redeliveries.
    #[must_use]
    pub const fn checks_staleness(self) -> bool {
        matches!(self, Self::StudentLesson)
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// SECTION: Action Kind
// ============================================================================

/// Per-record partner action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Record was created or updated.
    Upserted,
    /// Record was removed.
    Deleted,
}
