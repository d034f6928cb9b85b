//! Generic exponential-backoff retry helper.
//!
//! Shared by the LLM call in the generation orchestrator, the posting
//! backend client, and the remote-store client: each wants "try, and on a
//! transient failure wait longer and try again" without duplicating the
//! backoff arithmetic.

use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Configuration for [`with_backoff`].
#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds; attempt `n` (0-indexed) waits `base * 2^n`.
    pub base_delay_secs: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Delay before the given (0-indexed) retry attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.base_delay_secs * 2f64.powi(attempt as i32))
    }
}

/// Run `f` up to `config.max_attempts` times, sleeping `delay_for(attempt)`
/// between attempts. Re-raises the last error once attempts are exhausted.
pub async fn with_backoff<T, E, F, Fut>(config: BackoffConfig, label: &str, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= config.max_attempts {
                    tracing::warn!(label, attempt, %err, "retry attempts exhausted");
                    return Err(err);
                }
                let delay = config.delay_for(attempt - 1);
                tracing::debug!(label, attempt, delay_secs = delay.as_secs_f64(), %err, "retrying after transient failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_for_doubles_each_attempt() {
        let config = BackoffConfig {
            max_attempts: 3,
            base_delay_secs: 2.0,
        };
        assert_eq!(config.delay_for(0), Duration::from_secs_f64(2.0));
        assert_eq!(config.delay_for(1), Duration::from_secs_f64(4.0));
        assert_eq!(config.delay_for(2), Duration::from_secs_f64(8.0));
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let config = BackoffConfig {
            max_attempts: 3,
            base_delay_secs: 0.001,
        };
        let result: Result<u32, String> = with_backoff(config, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let config = BackoffConfig {
            max_attempts: 3,
            base_delay_secs: 0.001,
        };
        let result: Result<u32, String> = with_backoff(config, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient".to_string())
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_returns_last_error() {
        let calls = AtomicU32::new(0);
        let config = BackoffConfig {
            max_attempts: 2,
            base_delay_secs: 0.001,
        };
        let result: Result<u32, String> = with_backoff(config, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("always fails".to_string()) }
        })
        .await;
        assert_eq!(result, Err("always fails".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
