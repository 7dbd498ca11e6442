// crates/partner-sync-core/src/core/time.rs
// ============================================================================
// Module: Partner Sync Time Model
// Description: Canonical timestamps for sync log rows and telemetry.
// Purpose: Keep time arithmetic explicit and free of wall-clock reads.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Timestamps are unix epoch milliseconds. The core never reads the wall clock
//! directly; callers obtain "now" from [`crate::interfaces::Clock`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use time::Date;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Unix epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the midnight (UTC) timestamp that starts `date`.
    #[must_use]
    pub fn start_of_day(date: Date) -> Self {
        let seconds = date.midnight().assume_utc().unix_timestamp();
        Self(seconds.saturating_mul(1_000))
    }

    /// Returns the timestamp shifted back by `duration`.
    #[must_use]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_sub(millis))
    }

    /// Returns the timestamp shifted forward by `duration`.
    #[must_use]
    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// Returns how long before `now` this timestamp lies (zero if in the future).
    #[must_use]
    pub fn age_at(self, now: Self) -> Duration {
        let delta = now.0.saturating_sub(self.0);
        u64::try_from(delta).map_or(Duration::ZERO, Duration::from_millis)
    }

    /// Returns the UTC calendar date of the timestamp.
    #[must_use]
    pub fn utc_date(self) -> Option<Date> {
        let nanos = i128::from(self.0).saturating_mul(1_000_000);
        OffsetDateTime::from_unix_timestamp_nanos(nanos).ok().map(OffsetDateTime::date)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use std::time::Duration;

    use time::Date;
    use time::Month;

    use super::Timestamp;

    #[test]
    fn age_is_zero_for_future_timestamps() {
        let now = Timestamp::from_unix_millis(1_000);
        assert_eq!(Timestamp::from_unix_millis(5_000).age_at(now), Duration::ZERO);
        assert_eq!(Timestamp::from_unix_millis(400).age_at(now), Duration::from_millis(600));
    }

    #[test]
    fn start_of_day_round_trips_through_utc_date() {
        let date = Date::from_calendar_date(2024, Month::March, 9).unwrap();
        let ts = Timestamp::start_of_day(date);
        assert_eq!(ts.utc_date(), Some(date));
        assert_eq!(ts.saturating_add(Duration::from_secs(86_399)).utc_date(), Some(date));
    }
}
