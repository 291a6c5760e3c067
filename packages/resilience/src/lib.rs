#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Retry/backoff wrapper for flaky, rate-limited remote calls.
//!
//! Every remote boundary in the advisor goes through [`with_retry`] instead
//! of calling the transport directly. Rate-limit failures are retried with
//! exponential backoff; everything else propagates immediately, because
//! retrying a malformed response or a hard server failure only wastes the
//! caller's latency budget.
//!
//! Rate-limit classification is **structured**: each boundary error enum
//! implements [`RetryClass`], and any pattern matching on status codes or
//! quota messages lives in the transport adapter that builds the error, not
//! here.
//!
//! # Usage
//!
//! ```ignore
//! let policy = RetryPolicy::analysis();
//! let result = with_retry(policy, "street analysis", || {
//!     provider.generate_structured(&prompt, &schema)
//! })
//! .await?;
//! ```

use std::fmt::Display;
use std::time::Duration;

/// Classifies whether an error is eligible for backoff-and-retry.
///
/// Implemented by each remote boundary's error enum. Only quota/rate-limit
/// failures should report `true`; transient-vs-permanent distinctions beyond
/// that are out of scope for the wrapper.
pub trait RetryClass {
    /// Whether this failure indicates quota exhaustion / rate limiting.
    fn is_rate_limited(&self) -> bool;
}

/// Retry budget for one call site.
///
/// Policies differ per call site: interactive analysis calls get a longer
/// budget than background enrichment, which should fail fast and degrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of *retries* after the initial attempt.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Long budget for generative analysis calls, which are the most
    /// quota-constrained boundary.
    #[must_use]
    pub const fn analysis() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }

    /// Default budget for interactive geometry and conditions lookups.
    #[must_use]
    pub const fn interactive() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(500),
        }
    }

    /// Short budget for low-priority background calls (e.g., ambient
    /// weather) that must never hold up the operator.
    #[must_use]
    pub const fn background() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_millis(250),
        }
    }

    /// Backoff delay before retry `attempt` (0-indexed): `base_delay *
    /// 2^attempt`, saturating instead of overflowing for oversized
    /// budgets.
    #[must_use]
    pub const fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }
}

/// Executes `op`, retrying rate-limited failures with exponential backoff.
///
/// The delay before retry *i* (0-indexed) is `base_delay * 2^i`
/// (saturating, see [`RetryPolicy::delay_for`]), so the total number of
/// invocations is at most
/// `max_attempts + 1`. Non-rate-limited failures propagate immediately;
/// exhausting the budget propagates the last rate-limit failure.
///
/// # Errors
///
/// Returns the operation's error once the retry budget is exhausted or a
/// non-retryable failure occurs.
pub async fn with_retry<T, E, F, Fut>(
    policy: RetryPolicy,
    op_name: &str,
    mut op: F,
) -> Result<T, E>
where
    E: RetryClass + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limited() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                log::warn!(
                    "{op_name}: rate limited (retry {}/{} in {delay:?}): {e}",
                    attempt + 1,
                    policy.max_attempts,
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_rate_limited() {
                    log::error!(
                        "{op_name}: still rate limited after {} retries, giving up: {e}",
                        policy.max_attempts,
                    );
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    #[derive(Debug)]
    enum FakeError {
        RateLimited,
        Hard,
    }

    impl Display for FakeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::RateLimited => write!(f, "rate limited"),
                Self::Hard => write!(f, "hard failure"),
            }
        }
    }

    impl RetryClass for FakeError {
        fn is_rate_limited(&self) -> bool {
            matches!(self, Self::RateLimited)
        }
    }

    const POLICY: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(100),
    };

    #[tokio::test(start_paused = true)]
    async fn succeeds_without_retry() {
        let calls = Cell::new(0);
        let result: Result<u32, FakeError> = with_retry(POLICY, "test", || {
            calls.set(calls.get() + 1);
            async { Ok(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_doubles_per_retry() {
        let start = Instant::now();
        let calls = Cell::new(0);
        let result: Result<u32, FakeError> = with_retry(POLICY, "test", || {
            calls.set(calls.get() + 1);
            async { Err(FakeError::RateLimited) }
        })
        .await;

        assert!(matches!(result, Err(FakeError::RateLimited)));
        // Initial attempt plus max_attempts retries.
        assert_eq!(calls.get(), 4);
        // 100ms + 200ms + 400ms of backoff under the paused clock.
        assert_eq!(start.elapsed(), Duration::from_millis(700));
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_mid_budget() {
        let calls = Cell::new(0);
        let result: Result<u32, FakeError> = with_retry(POLICY, "test", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(FakeError::RateLimited)
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hard_failure_propagates_immediately() {
        let start = Instant::now();
        let calls = Cell::new(0);
        let result: Result<u32, FakeError> = with_retry(POLICY, "test", || {
            calls.set(calls.get() + 1);
            async { Err(FakeError::Hard) }
        })
        .await;
        assert!(matches!(result, Err(FakeError::Hard)));
        assert_eq!(calls.get(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn backoff_delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy {
            max_attempts: 64,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        // 2^40 overflows u32; the multiplier saturates rather than
        // panicking mid-retry-loop.
        assert_eq!(
            policy.delay_for(40),
            Duration::from_millis(100).saturating_mul(u32::MAX)
        );
        assert!(policy.delay_for(63) >= policy.delay_for(31));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retry_policy_attempts_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            base_delay: Duration::from_millis(100),
        };
        let calls = Cell::new(0);
        let result: Result<u32, FakeError> = with_retry(policy, "test", || {
            calls.set(calls.get() + 1);
            async { Err(FakeError::RateLimited) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
