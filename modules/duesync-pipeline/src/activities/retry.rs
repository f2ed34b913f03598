use std::future::Future;
use std::time::Duration;

use duesync_common::SyncError;
use tracing::warn;

/// Exponential backoff for activity bodies: 1 s initial, doubling, capped
/// at 60 s, 3 attempts. Non-retryable errors short-circuit.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            cap: Duration::from_secs(60),
            max_attempts: 3,
        }
    }
}

pub async fn with_retries<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    mut f: F,
) -> Result<T, SyncError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let mut delay = policy.initial;

    for attempt in 1..=policy.max_attempts {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => {
                warn!(label, attempt, error = %e, "Activity failed terminally");
                return Err(e);
            }
            Err(e) if attempt == policy.max_attempts => {
                warn!(label, attempt, error = %e, "Activity exhausted retries");
                return Err(e);
            }
            Err(e) => {
                warn!(label, attempt, error = %e, "Activity attempt failed, backing off");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(policy.cap);
            }
        }
    }

    unreachable!("retry loop returns on the final attempt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            initial: Duration::from_millis(1),
            cap: Duration::from_millis(4),
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result = with_retries("test", &fast_policy(), || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(SyncError::TransientIo("flaky".into()))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = with_retries("test", &fast_policy(), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(SyncError::TransientIo("always down".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_errors_do_not_retry() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = with_retries("test", &fast_policy(), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(SyncError::Authentication("bad cookies".into()))
        })
        .await;
        assert!(matches!(result, Err(SyncError::Authentication(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
