// crates/partner-sync-core/src/core/records.rs
// ============================================================================
// Module: Partner Sync Records
// Description: Typed partner records carried inside sync envelopes.
// Purpose: Give each handler a strongly typed record array to chunk and apply.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Records are routed by kind only; the engine never interprets business
//! fields beyond the student package class ids needed for derived events.
//! Dates are unix seconds as supplied by the partner ingress.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::kind::ActionKind;

// ============================================================================
// SECTION: Master Registration Records
// ============================================================================

/// Course master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Partner action.
    pub action_kind: ActionKind,
    /// Course identifier.
    pub course_id: String,
    /// Course display name.
    #[serde(default)]
    pub course_name: String,
    /// Partner course status label.
    #[serde(default)]
    pub status: String,
    /// Academic year the course belongs to, when known.
    #[serde(default)]
    pub academic_year_id: Option<String>,
}

/// Class master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    /// Partner action.
    pub action_kind: ActionKind,
    /// Numeric partner class identifier.
    pub class_id: i64,
    /// Class display name.
    #[serde(default)]
    pub class_name: String,
    /// Course the class is attached to.
    #[serde(default)]
    pub course_id: String,
    /// Class start date (unix seconds).
    #[serde(default)]
    pub start_date: i64,
    /// Class end date (unix seconds).
    #[serde(default)]
    pub end_date: i64,
    /// Academic year the class belongs to, when known.
    #[serde(default)]
    pub academic_year_id: Option<String>,
}

/// Live lesson master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRecord {
    /// Partner action.
    pub action_kind: ActionKind,
    /// Lesson identifier.
    pub lesson_id: String,
    /// Lesson delivery type (`online`, `offline`, `hybrid`).
    #[serde(default)]
    pub lesson_type: String,
    /// Course the lesson belongs to.
    #[serde(default)]
    pub course_id: String,
    /// Lesson start (unix seconds).
    #[serde(default)]
    pub start_date: i64,
    /// Lesson end (unix seconds).
    #[serde(default)]
    pub end_date: i64,
    /// Class name shown to attendees.
    #[serde(default)]
    pub class_name: String,
    /// Partner lesson group label.
    #[serde(default)]
    pub lesson_group: String,
}

/// Academic year master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicYearRecord {
    /// Partner action.
    pub action_kind: ActionKind,
    /// Academic year identifier.
    pub academic_year_id: String,
    /// Academic year display name.
    #[serde(default)]
    pub name: String,
    /// First day of the year (unix seconds).
    #[serde(default)]
    pub start_year_date: i64,
    /// Last day of the year (unix seconds).
    #[serde(default)]
    pub end_year_date: i64,
}

// ============================================================================
// SECTION: User Registration Records
// ============================================================================

/// Package a student holds for one partner class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentPackageRecord {
    /// Partner class identifier.
    pub class_id: i64,
    /// Package start (unix seconds).
    pub start_date: i64,
    /// Package end (unix seconds).
    pub end_date: i64,
}

/// Student master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Partner action.
    pub action_kind: ActionKind,
    /// Student identifier.
    pub student_id: String,
    /// Family name.
    #[serde(default)]
    pub last_name: String,
    /// Given name.
    #[serde(default)]
    pub given_name: String,
    /// Partner student division identifiers.
    #[serde(default)]
    pub student_divs: Vec<i64>,
    /// Class packages held by the student.
    #[serde(default)]
    pub packages: Vec<StudentPackageRecord>,
}

/// Staff master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffRecord {
    /// Partner action.
    pub action_kind: ActionKind,
    /// Staff identifier.
    pub staff_id: String,
    /// Staff display name.
    #[serde(default)]
    pub name: String,
}

// ============================================================================
// SECTION: User Course Records
// ============================================================================

/// Lessons assigned to one student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentLessonRecord {
    /// Partner action.
    pub action_kind: ActionKind,
    /// Student identifier.
    pub student_id: String,
    /// Lesson identifiers the student attends.
    #[serde(default)]
    pub lesson_ids: Vec<String>,
}
