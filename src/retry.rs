use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

use crate::error::StageError;

/// Bounded retry with linear backoff for remote calls.
///
/// Only errors whose `is_transient()` holds are retried; permanent
/// rejections surface immediately. Exhausting the allowed attempts returns
/// the last transient error, which is fatal for the record.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    /// Each attempt re-invokes `op` with the same inputs (the chunk
    /// artifact is reused, never re-extracted).
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, StageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StageError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.base_delay * attempt;
                    warn!(
                        "⏳ {} attempt {}/{} failed ({}), retrying in {:.1}s",
                        what,
                        attempt,
                        self.max_attempts,
                        e,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        error!("❌ {} failed after {} attempts: {}", what, attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = fast_policy(3)
            .run("test call", || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(StageError::Transient("timeout".into()))
                    } else {
                        Ok("text")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "text");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = fast_policy(5)
            .run("test call", || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(StageError::Transcription("unsupported format".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(StageError::Transcription(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_transient_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<(), _> = fast_policy(3)
            .run("test call", || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(StageError::Transient("connection reset".into()))
                }
            })
            .await;

        assert!(matches!(result, Err(StageError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
