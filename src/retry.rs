// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Retry logic with exponential backoff for batch submission.
//!
//! A chunk submission is one atomic request; resubmitting a rejected chunk
//! is safe because the zone either applied it completely or not at all.
//! Transient failures are retried with exponential backoff, while a
//! [`RejectedChange`] fails immediately: the zone refuses the same batch
//! every time.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::constants::{
    APPLY_BACKOFF_MULTIPLIER, DEFAULT_APPLY_INITIAL_BACKOFF_MILLIS, DEFAULT_APPLY_MAX_ATTEMPTS,
    DEFAULT_APPLY_MAX_BACKOFF_SECS,
};
use crate::errors::RejectedChange;

/// Retry policy for a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff_millis: u64,
    /// Upper bound on any single delay
    pub max_backoff_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_APPLY_MAX_ATTEMPTS,
            initial_backoff_millis: DEFAULT_APPLY_INITIAL_BACKOFF_MILLIS,
            max_backoff_secs: DEFAULT_APPLY_MAX_BACKOFF_SECS,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff schedule for this policy.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            Duration::from_millis(self.initial_backoff_millis),
            Duration::from_secs(self.max_backoff_secs),
            APPLY_BACKOFF_MULTIPLIER,
        )
    }
}

/// Deterministic exponential backoff.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Interval returned by the next call
    pub current_interval: Duration,
    /// Maximum interval duration
    pub max_interval: Duration,
    /// Growth factor applied after each call
    pub multiplier: f64,
}

impl ExponentialBackoff {
    /// Create a backoff starting at `initial_interval`.
    #[must_use]
    pub fn new(initial_interval: Duration, max_interval: Duration, multiplier: f64) -> Self {
        Self {
            current_interval: initial_interval.min(max_interval),
            max_interval,
            multiplier,
        }
    }

    /// Next interval to wait; grows geometrically up to the maximum.
    pub fn next_backoff(&mut self) -> Duration {
        let interval = self.current_interval;
        let next = interval.as_secs_f64() * self.multiplier;
        self.current_interval = Duration::from_secs_f64(next).min(self.max_interval);
        interval
    }
}

/// Whether a failed submission may succeed when resubmitted.
///
/// Refusals caused by the batch contents are permanent; everything else
/// (throttling, connectivity, provider errors) is treated as transient.
#[must_use]
pub fn is_retryable(error: &anyhow::Error) -> bool {
    !error
        .chain()
        .any(|cause| cause.downcast_ref::<RejectedChange>().is_some())
}

/// Run `operation` until it succeeds, fails permanently, or the policy's
/// attempts are used up.
///
/// # Errors
///
/// Returns the first non-retryable error, or the last error once every
/// attempt has failed.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
    operation_name: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = policy.backoff();
    let start_time = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt,
                        elapsed = ?start_time.elapsed(),
                        "operation succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Err(e) if !is_retryable(&e) => {
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %e,
                    "non-retryable failure, failing immediately"
                );
                return Err(e);
            }
            Err(e) if attempt >= max_attempts => {
                error!(
                    operation = operation_name,
                    attempt,
                    elapsed = ?start_time.elapsed(),
                    error = %e,
                    "attempts exhausted, giving up"
                );
                return Err(e);
            }
            Err(e) => {
                let delay = backoff.next_backoff();
                warn!(
                    operation = operation_name,
                    attempt,
                    retry_after = ?delay,
                    error = %e,
                    "operation failed, will retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
