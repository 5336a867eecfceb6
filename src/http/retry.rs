//! Retry with exponential backoff
//!
//! [`retry`] wraps any request-shaped async operation. Which errors are
//! retried, how long to wait and how many attempts to make all come from a
//! [`RetryPolicy`].

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default multiplicative backoff factor
pub const DEFAULT_BACKOFF_FACTOR: u32 = 3;

/// Default number of attempts (first try included)
pub const DEFAULT_MAX_TRIES: u32 = 8;

/// Backoff schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry
    Constant(Duration),
    /// `base * factor^k` before retry `k` (0-based)
    Exponential {
        /// Delay before the first retry
        base: Duration,
        /// Growth per retry
        factor: u32,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_secs(1),
            factor: DEFAULT_BACKOFF_FACTOR,
        }
    }
}

impl Backoff {
    /// Delay to wait before retry number `retry` (0-based)
    pub fn delay(&self, retry: u32) -> Duration {
        match *self {
            Self::Constant(delay) => delay,
            Self::Exponential { base, factor } => {
                base.saturating_mul(factor.saturating_pow(retry))
            }
        }
    }

    /// The full wait schedule, one entry per retry
    pub fn schedule(self) -> impl Iterator<Item = Duration> {
        (0..).map(move |retry| self.delay(retry))
    }
}

/// Retry policy: predicate, backoff schedule and attempt cap
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Wait schedule between attempts
    pub backoff: Backoff,
    /// Maximum attempts, first try included
    pub max_tries: u32,
    /// Which errors are worth another attempt
    pub retry_on: fn(&Error) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Backoff::default(),
            max_tries: DEFAULT_MAX_TRIES,
            retry_on: Error::is_retryable,
        }
    }
}

impl RetryPolicy {
    /// Exponential policy with the default factor
    pub fn exponential(base: Duration, max_tries: u32) -> Self {
        Self {
            backoff: Backoff::Exponential {
                base,
                factor: DEFAULT_BACKOFF_FACTOR,
            },
            max_tries,
            ..Self::default()
        }
    }

    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_tries: 1,
            ..Self::default()
        }
    }

    /// Replace the retry predicate
    #[must_use]
    pub fn retry_on(mut self, predicate: fn(&Error) -> bool) -> Self {
        self.retry_on = predicate;
        self
    }

    /// Check whether an error should be retried
    pub fn should_retry(&self, err: &Error) -> bool {
        (self.retry_on)(err)
    }
}

/// Run `op` until it succeeds, fails with a non-retriable error, or the
/// policy's attempt cap is reached
///
/// `op` receives the 1-based attempt number. When the cap is reached the last
/// error is returned wrapped in [`Error::RetriesExhausted`].
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_tries = policy.max_tries.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if !policy.should_retry(&err) => return Err(err),
            Err(err) if attempt >= max_tries => {
                return Err(Error::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            Err(err) => {
                let delay = policy.backoff.delay(attempt - 1);
                warn!(
                    attempt,
                    max_tries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retriable request failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
