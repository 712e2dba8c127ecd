//! Generic call-with-retry policy.
//!
//! Wraps any fallible async operation. Errors the caller's predicate marks
//! as recoverable are retried up to `max_attempts` total calls, sleeping
//! `delay` (scaled by `backoff` after each failure) between attempts. The
//! final attempt's outcome propagates as-is; non-recoverable errors
//! propagate immediately.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the final uncaught one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    /// 1.0 keeps the delay fixed.
    pub backoff: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(2),
            backoff: 1.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: 1.0,
        }
    }

    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Run `op`, retrying on errors for which `recoverable` returns true.
///
/// Each failed attempt is logged at warning level together with `context`;
/// logging never fails the operation itself. After `max_attempts - 1`
/// caught failures the operation is invoked one last time and its result,
/// success or error, is returned unchanged.
pub async fn with_retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    recoverable: P,
    context: &str,
    mut op: F,
) -> std::result::Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut delay = policy.delay;

    for attempt in 1..policy.max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if recoverable(&e) => {
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "{context}: attempt failed, retrying"
                );
                sleep(delay).await;
                delay = delay.mul_f64(policy.backoff);
            }
            Err(e) => return Err(e),
        }
    }

    op().await
}
