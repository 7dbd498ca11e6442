// crates/partner-sync-core/src/runtime/resolver.rs
// ============================================================================
// Module: Static Class Resolver
// Description: Fixed class-to-course table.
// Purpose: Resolve package class ids from configuration or test fixtures.
// Dependencies: async-trait
// ============================================================================

//! ## Overview
//! [`StaticClassCourseResolver`] answers from an in-memory table. Class ids
//! missing from the table are omitted from the answer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::interfaces::ClassCourseResolver;
use crate::interfaces::ResolveError;

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Class resolver backed by a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticClassCourseResolver {
    /// Course ids keyed by class id.
    courses_by_class: BTreeMap<i64, Vec<String>>,
}

impl StaticClassCourseResolver {
    /// Creates a resolver over `courses_by_class`.
    #[must_use]
    pub const fn new(courses_by_class: BTreeMap<i64, Vec<String>>) -> Self {
        Self {
            courses_by_class,
        }
    }
}

#[async_trait]
impl ClassCourseResolver for StaticClassCourseResolver {
    async fn course_ids_by_class(
        &self,
        class_ids: &[i64],
    ) -> Result<BTreeMap<i64, Vec<String>>, ResolveError> {
        Ok(class_ids
            .iter()
            .filter_map(|class_id| {
                self.courses_by_class.get(class_id).map(|courses| (*class_id, courses.clone()))
            })
            .collect())
    }
}
