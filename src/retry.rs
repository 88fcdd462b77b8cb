//! Fixed-delay retry policy
//!
//! Wraps a fallible async operation with a bounded number of retries.
//! The pause between attempts is constant: no exponential growth, no jitter,
//! and every error is treated as retryable until the budget runs out.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry budget and the pause inserted after each failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt (total attempts = `max_retries + 1`).
    pub max_retries: u32,
    /// Constant pause between a failed attempt and the next one.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with a constant delay between attempts.
    pub const fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Policy used for archive page requests: 5 retries, one second apart.
    pub const fn archive() -> Self {
        Self::fixed(5, Duration::from_millis(1000))
    }

    /// Run `op` until it succeeds or the retry budget is exhausted.
    ///
    /// Exactly one pause of `delay` happens per failed attempt that gets
    /// retried, so an operation that never succeeds sleeps `max_retries`
    /// times before its last error is returned. `what` labels log lines and
    /// the final error context.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retries = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if retries >= self.max_retries {
                        return Err(err.context(format!(
                            "{} failed after {} attempt(s)",
                            what,
                            retries + 1
                        )));
                    }
                    retries += 1;
                    warn!(
                        attempt = retries,
                        max_retries = self.max_retries,
                        delay_ms = self.delay.as_millis() as u64,
                        "{} failed, retrying: {:#}",
                        what,
                        err
                    );
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::archive()
    }
}
