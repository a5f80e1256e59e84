// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::{is_retryable, retry_with_backoff, ExponentialBackoff, RetryPolicy};
    use crate::errors::RejectedChange;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff_millis: 0,
            max_backoff_secs: 0,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff_millis, 500);
        assert_eq!(policy.max_backoff_secs, 10);
    }

    #[test]
    fn test_backoff_doubles_until_capped() {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_millis(500),
            Duration::from_secs(2),
            2.0,
        );

        let schedule: Vec<Duration> = (0..5).map(|_| backoff.next_backoff()).collect();

        assert_eq!(
            schedule,
            vec![
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(2),
                Duration::from_secs(2),
            ]
        );
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = retry_with_backoff(
            &fast(3),
            move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    anyhow::bail!("throttled");
                }
                Ok("applied")
            },
            "apply",
        )
        .await;

        assert_eq!(result.unwrap(), "applied");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: anyhow::Result<()> = retry_with_backoff(
            &fast(2),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("rejected")
            },
            "apply",
        )
        .await;

        assert_eq!(result.unwrap_err().to_string(), "rejected");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_once_policy_never_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: anyhow::Result<()> = retry_with_backoff(
            &RetryPolicy::once(),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("rejected")
            },
            "apply",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_change_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: anyhow::Result<()> = retry_with_backoff(
            &fast(5),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::Error::from(RejectedChange::AlreadyExists(
                    "a.example.com.".to_string(),
                )))
            },
            "apply",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_is_retryable_looks_through_context() {
        let rejected = anyhow::Error::from(RejectedChange::DeleteMismatch("x.".to_string()))
            .context("apply chunk 0");

        assert!(!is_retryable(&rejected));
        assert!(is_retryable(&anyhow::anyhow!("throttled")));
    }
}
