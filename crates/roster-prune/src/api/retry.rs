//! Backoff-and-retry for read calls.
//!
//! Only throttling (429), gateway/server errors (500, 502, 503, 504), and
//! connect or timeout failures are retried. The archive write never goes
//! through here.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::ApiError;

/// Backoff policy for read calls. Delays start at one second and are capped
/// at 30 s.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Extra attempts after the first failure. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor applied per attempt.
    pub multiplier: f64,
    /// Scale each delay by a fixed per-attempt factor.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt + 1`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = (self.initial_delay.as_secs_f64() * self.multiplier.powi(exp))
            .min(self.max_delay.as_secs_f64());
        let factor = if self.jitter {
            JITTER[attempt as usize % JITTER.len()]
        } else {
            1.0
        };
        Duration::from_secs_f64(secs * factor)
    }
}

const JITTER: [f64; 4] = [0.75, 0.9, 0.6, 0.85];

/// Whether an error indicates a transient (retryable) failure.
pub fn is_transient(error: &ApiError) -> bool {
    match error {
        ApiError::Status { status, .. } => {
            matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
        }
        ApiError::Http(e) => e.is_timeout() || e.is_connect(),
        _ => false,
    }
}

/// Run `op` until it succeeds, fails permanently, or retries are exhausted.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, what: &str, mut op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < config.max_retries && is_transient(&e) => {
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    "{what} failed ({e}), retrying in {:.1}s [{}/{}]",
                    delay.as_secs_f64(),
                    attempt + 1,
                    config.max_retries
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn status(code: u16) -> ApiError {
        ApiError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        }
    }

    fn fast(retries: u32) -> RetryConfig {
        RetryConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..RetryConfig::with_retries(retries)
        }
    }

    #[test]
    fn retrying_is_off_by_default() {
        assert_eq!(RetryConfig::default().max_retries, 0);
        assert_eq!(RetryConfig::with_retries(3).max_retries, 3);
    }

    #[test]
    fn backoff_doubles_until_capped() {
        let config = RetryConfig {
            jitter: false,
            ..RetryConfig::with_retries(8)
        };
        let delays: Vec<u64> = (0..7)
            .map(|a| config.delay_for_attempt(a).as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn jitter_only_shortens_delays() {
        let config = RetryConfig::with_retries(8);
        let plain = RetryConfig {
            jitter: false,
            ..config.clone()
        };
        for attempt in 0..8 {
            assert!(config.delay_for_attempt(attempt) < plain.delay_for_attempt(attempt));
        }
    }

    #[test]
    fn transient_statuses_detected() {
        assert!(is_transient(&status(429)));
        assert!(is_transient(&status(503)));
        assert!(!is_transient(&status(400)));
        assert!(!is_transient(&status(401)));
        assert!(!is_transient(&status(404)));
        assert!(!is_transient(&ApiError::NoAccount));
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast(3), "list contacts", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err(status(502)) } else { Ok(n) } }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast(3), "get contact", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(status(401)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast(2), "accounts", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(status(500)) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
