//! Bounded retry with a fixed delay between attempts.
//!
//! The embedding API is the only collaborator worth retrying here, and its
//! failure mode is transient rate limiting, so a fixed-delay bounded policy is
//! enough. No exponential backoff.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error_handler::{AiEmbedError, Result};

/// Bounded-attempt policy consumed by retried service calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts (first try included). Clamped to at least 1.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Runs `op` up to `policy.max_attempts` times with `policy.delay` between
/// attempts.
///
/// Authentication rejections are returned immediately: retrying a bad key is
/// pointless and hammers the provider. Every other error is logged and retried
/// until attempts run out, then wrapped in [`AiEmbedError::RetriesExhausted`].
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max = policy.max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                warn!("{what} failed (attempt {attempt}/{max}): {e}");
                if attempt >= max {
                    return Err(AiEmbedError::RetriesExhausted {
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_two_failures_with_three_attempts() {
        let calls = Cell::new(0u32);
        let out = with_retry(&policy(), "test op", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(AiEmbedError::Decode("flaky".into()))
                } else {
                    Ok(42u32)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 42);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = Cell::new(0u32);
        let err = with_retry(&policy(), "test op", || {
            calls.set(calls.get() + 1);
            async { Err::<u32, _>(AiEmbedError::Decode("down".into())) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.get(), 3);
        match err {
            AiEmbedError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn auth_rejection_is_not_retried() {
        let calls = Cell::new(0u32);
        let err = with_retry(&policy(), "test op", || {
            calls.set(calls.get() + 1);
            async {
                Err::<u32, _>(AiEmbedError::Auth {
                    url: "https://api.example.com".into(),
                })
            }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.get(), 1);
        assert!(err.is_auth());
    }
}
