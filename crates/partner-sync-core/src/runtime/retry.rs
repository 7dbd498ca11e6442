// crates/partner-sync-core/src/runtime/retry.rs
// ============================================================================
// Module: Retry Policy
// Description: Bounded retries with exponential backoff.
// Purpose: Replace ad-hoc sleep loops around broker publishes.
// Dependencies: tokio
// ============================================================================

//! ## Overview
//! A [`RetryPolicy`] runs an async operation up to `max_attempts` times,
//! sleeping between attempts with a doubling backoff capped at `max_backoff`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Bounded retry with exponential backoff.
///
/// # Invariants
/// - At least one attempt is always made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Policy that makes exactly one attempt.
    #[must_use]
    pub const fn once() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Returns the delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let factor = 1_u32 << exponent;
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Runs `op` until it succeeds or attempts are exhausted.
    ///
    /// `op` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= attempts => return Err(err),
                Err(_) => {
                    tokio::time::sleep(self.backoff_after(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
