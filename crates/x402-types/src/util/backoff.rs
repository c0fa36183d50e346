//! Bounded exponential retry for transient network failures.
//!
//! Only the unauthenticated request and chain RPC reads go through a [`RetryPolicy`].
//! A paid request is never retried: the signed payload it carries may already
//! have been consumed by the server.

use std::future::Future;
use std::time::Duration;

#[cfg(feature = "telemetry")]
use tracing::debug;

/// How many times to try an operation and how long to wait in between.
///
/// The delay before retry `n` (1-based) is `base_delay * factor^(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero behaves like one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: u32,
}

impl Default for RetryPolicy {
    /// Three attempts, waiting 1 s then 2 s.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2,
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation exactly once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            factor: 1,
        }
    }

    /// Delay to wait before the given retry (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1);
        let multiplier = self.factor.saturating_pow(exponent);
        self.base_delay.saturating_mul(multiplier)
    }

    /// Runs `op` until it yields an outcome `should_retry` rejects, or attempts run out.
    ///
    /// `should_retry` sees the whole outcome so callers can retry on successful values
    /// too, e.g. an HTTP 429 response.
    pub async fn retry<T, E, F, Fut, P>(&self, mut op: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&Result<T, E>) -> bool,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = op().await;
            if attempt >= max_attempts || !should_retry(&outcome) {
                return outcome;
            }
            let delay = self.delay_for(attempt);
            #[cfg(feature = "telemetry")]
            debug!(attempt, max_attempts, delay_ms = delay.as_millis() as u64, "Transient failure, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
