// crates/partner-sync-core/src/runtime/recovery.rs
// ============================================================================
// Module: Sync Recovery and Reports
// Description: Date-ranged split reports and bounded republishing.
// Purpose: Give operators a way to inspect and recover stuck splits.
// Dependencies: time, thiserror, crate::{interfaces, runtime}
// ============================================================================

//! ## Overview
//! Both operations take an inclusive [`DateRange`] over split creation dates.
//! [`status_report`] counts splits per day and status without a publisher;
//! [`SyncRecovery::report`] is the same query through a recovery service.
//! [`SyncRecovery::recover`] republishes every unfinished split whose retry
//! budget is not exhausted and marks the rest failed. `Processing` splits
//! updated within the in-flight window are left to the broker's redelivery.
//! Invariants:
//! - Ranges are at most `max_days` wide and never reversed.
//! - A split is republished at most `max_retry` times by recovery.
//! - An exhausted split is abandoned once and skipped on later runs.
//! - One failed republish never aborts the rest of the range.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::Date;
use time::macros::format_description;

use crate::core::SplitId;
use crate::core::StatusCounts;
use crate::core::SyncLogId;
use crate::core::SyncStatus;
use crate::core::Timestamp;
use crate::interfaces::Clock;
use crate::interfaces::StoreError;
use crate::interfaces::SyncLogStore;
use crate::runtime::publisher::BatchPublisher;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default widest accepted range in days.
pub const DEFAULT_MAX_RANGE_DAYS: u32 = 30;
/// Default recovery attempts per split.
pub const DEFAULT_RECOVER_MAX_RETRY: u32 = 3;
/// Default age a `Processing` split must reach before recovery republishes it.
pub const DEFAULT_IN_FLIGHT_WINDOW: Duration = Duration::from_secs(5 * 60);
/// Seconds per day.
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// SECTION: Date Range
// ============================================================================

/// Date range parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateRangeError {
    /// A bound was empty.
    #[error("{0} date is required")]
    Missing(&'static str),
    /// A bound is not `YYYY-MM-DD`.
    #[error("invalid {bound} date {value}: expected YYYY-MM-DD")]
    Invalid {
        /// Which bound failed.
        bound: &'static str,
        /// Rejected input.
        value: String,
    },
    /// End precedes start.
    #[error("to date must not be before from date")]
    Reversed,
    /// Range is wider than allowed.
    #[error("date range spans {days} days (max {max_days})")]
    TooWide {
        /// Requested span in days.
        days: i64,
        /// Maximum span in days.
        max_days: u32,
    },
}

/// Inclusive UTC date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// First day.
    from: Date,
    /// Last day.
    to: Date,
}

impl DateRange {
    /// Parses `YYYY-MM-DD` bounds and enforces the span limit.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError`] for missing, malformed, reversed, or
    /// oversized ranges.
    pub fn parse(from: &str, to: &str, max_days: u32) -> Result<Self, DateRangeError> {
        let from = parse_date("from", from)?;
        let to = parse_date("to", to)?;
        Self::new(from, to, max_days)
    }

    /// Builds a range from dates and enforces the span limit.
    ///
    /// # Errors
    ///
    /// Returns [`DateRangeError::Reversed`] or [`DateRangeError::TooWide`].
    pub fn new(from: Date, to: Date, max_days: u32) -> Result<Self, DateRangeError> {
        let days = (to - from).whole_days();
        if days < 0 {
            return Err(DateRangeError::Reversed);
        }
        if days > i64::from(max_days) {
            return Err(DateRangeError::TooWide {
                days,
                max_days,
            });
        }
        Ok(Self {
            from,
            to,
        })
    }

    /// Returns the first day.
    #[must_use]
    pub const fn first_day(&self) -> Date {
        self.from
    }

    /// Returns the last day.
    #[must_use]
    pub const fn last_day(&self) -> Date {
        self.to
    }

    /// Returns the first instant of the range.
    #[must_use]
    pub fn start(&self) -> Timestamp {
        Timestamp::start_of_day(self.from)
    }

    /// Returns the first instant after the range.
    #[must_use]
    pub fn end_exclusive(&self) -> Timestamp {
        Timestamp::start_of_day(self.to).saturating_add(DAY)
    }
}

/// Parses one `YYYY-MM-DD` bound.
fn parse_date(bound: &'static str, value: &str) -> Result<Date, DateRangeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DateRangeError::Missing(bound));
    }
    Date::parse(trimmed, format_description!("[year]-[month]-[day]")).map_err(|_| {
        DateRangeError::Invalid {
            bound,
            value: trimmed.to_string(),
        }
    })
}

/// Formats a date as `YYYY-MM-DD`.
fn format_day(date: Date) -> Option<String> {
    date.format(format_description!("[year]-[month]-[day]")).ok()
}

// ============================================================================
// SECTION: Reports
// ============================================================================

/// Counts splits created in `range` per `YYYY-MM-DD` day and status.
///
/// Only days with at least one split appear; every status is present.
///
/// # Errors
///
/// Returns [`StoreError`] when the store query fails.
pub async fn status_report(
    store: &dyn SyncLogStore,
    range: DateRange,
) -> Result<BTreeMap<String, StatusCounts>, StoreError> {
    let splits = store.splits_created_between(range.start(), range.end_exclusive()).await?;
    let mut report: BTreeMap<String, StatusCounts> = BTreeMap::new();
    for split in splits {
        let Some(day) = split.created_at.utc_date().and_then(format_day) else {
            continue;
        };
        report.entry(day).or_default().add(split.status, 1);
    }
    Ok(report)
}

// ============================================================================
// SECTION: Recovery
// ============================================================================

/// Per-split outcome of a recovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Splits marked failed because their retry budget is spent.
    pub abandoned: Vec<SplitId>,
    /// Splits republished.
    pub republished: Vec<SplitId>,
    /// `Processing` splits skipped because they may still be in flight.
    pub in_flight: Vec<SplitId>,
    /// Splits whose republish failed, with the failure message.
    pub errors: Vec<(SplitId, String)>,
}

/// Recovery errors that abort the whole run.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Report and recovery operations over split history.
#[derive(Clone)]
pub struct SyncRecovery {
    /// Sync log store.
    store: Arc<dyn SyncLogStore>,
    /// Producer used to republish splits.
    publisher: BatchPublisher,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Recovery attempts per split.
    max_retry: u32,
    /// Minimum age of a `Processing` split before it is republished.
    in_flight_window: Duration,
}

impl SyncRecovery {
    /// Creates a recovery service with the default retry budget.
    #[must_use]
    pub fn new(
        store: Arc<dyn SyncLogStore>,
        publisher: BatchPublisher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            publisher,
            clock,
            max_retry: DEFAULT_RECOVER_MAX_RETRY,
            in_flight_window: DEFAULT_IN_FLIGHT_WINDOW,
        }
    }

    /// Replaces the recovery attempts per split.
    #[must_use]
    pub const fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Replaces the minimum age of a `Processing` split before republishing.
    #[must_use]
    pub const fn with_in_flight_window(mut self, window: Duration) -> Self {
        self.in_flight_window = window;
        self
    }

    /// Counts splits created in `range` per day and status.
    ///
    /// Only days with at least one split appear; every status is present.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError`] when the store query fails.
    pub async fn report(
        &self,
        range: DateRange,
    ) -> Result<BTreeMap<String, StatusCounts>, RecoveryError> {
        Ok(status_report(self.store.as_ref(), range).await?)
    }

    /// Republishes or abandons every unfinished split created in `range`.
    ///
    /// Splits already abandoned are skipped. `Processing` splits updated
    /// within the in-flight window are listed in [`RecoveryReport::in_flight`].
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError`] when the split query or a status write fails.
    /// Publish failures are collected in [`RecoveryReport::errors`].
    pub async fn recover(&self, range: DateRange) -> Result<RecoveryReport, RecoveryError> {
        let splits = self.store.splits_created_between(range.start(), range.end_exclusive()).await?;
        let mut report = RecoveryReport::default();
        let mut touched: BTreeSet<SyncLogId> = BTreeSet::new();
        let now = self.clock.now();
        for split in splits.into_iter().filter(|split| split.status != SyncStatus::Success) {
            let exhausted = split.retry_times >= self.max_retry;
            if exhausted && split.status == SyncStatus::Failed {
                continue;
            }
            if split.status == SyncStatus::Processing
                && split.updated_at.saturating_add(self.in_flight_window) > now
            {
                report.in_flight.push(split.split_id);
                continue;
            }
            if exhausted {
                self.store.abandon_split(&split.split_id, now).await?;
                report.abandoned.push(split.split_id);
                continue;
            }
            let split = self.store.increment_retry(&split.split_id, now).await?;
            let Some(log) = self.store.get_log(&split.log_id).await? else {
                let message = format!("sync log {} not found", split.log_id);
                report.errors.push((split.split_id, message));
                continue;
            };
            if touched.insert(log.log_id.clone()) {
                self.store.touch_log(&log.log_id, now).await?;
            }
            match self.publisher.republish(&log, &split).await {
                Ok(()) => report.republished.push(split.split_id),
                Err(err) => report.errors.push((split.split_id, err.to_string())),
            }
        }
        Ok(report)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
