//! Retry with exponential backoff, per-call timeouts, and outage tracking
//!
//! Used for every call to an external collaborator. Transient failures are
//! retried, permanent failures are returned at once, and a timeout ends the
//! attempt sequence immediately (it counts the same as running out of retries).

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Errors that can say whether another attempt might succeed
pub trait Transient {
    fn is_transient(&self) -> bool;

    /// Server-provided wait hint, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Why a retried operation gave up
#[derive(Error, Debug)]
pub enum RetryError<E> {
    #[error("{last} (gave up after {attempts} attempts)")]
    Exhausted { last: E, attempts: u32 },

    #[error("{0}")]
    Permanent(E),

    #[error("timed out after {elapsed:?} (attempt {attempts})")]
    TimedOut { elapsed: Duration, attempts: u32 },
}

impl<E> RetryError<E> {
    /// The underlying error, if the failure was not a timeout
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Permanent(e) => Some(e),
            RetryError::TimedOut { .. } => None,
        }
    }
}

/// Retry schedule for external calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Bound on each attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn no_retry(timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            timeout,
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn backoff(&self, retry: u32, hint: Option<Duration>) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let exponential = self.initial_backoff.saturating_mul(1u32 << exponent);
        hint.unwrap_or(exponential).min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails permanently, times out, or retries run out
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        E: Transient + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match tokio::time::timeout(self.timeout, op()).await {
                Err(_) => {
                    warn!("{}: timed out after {:?}", label, self.timeout);
                    return Err(RetryError::TimedOut {
                        elapsed: self.timeout,
                        attempts,
                    });
                }
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if !e.is_transient() => return Err(RetryError::Permanent(e)),
                Ok(Err(e)) => {
                    if attempts > self.max_retries {
                        warn!("{}: giving up after {} attempts: {}", label, attempts, e);
                        return Err(RetryError::Exhausted { last: e, attempts });
                    }
                    let delay = self.backoff(attempts, e.retry_after());
                    warn!(
                        "{}: attempt {} failed ({}), retrying in {:?}",
                        label, attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Tracks consecutive collaborator failures and trips after a threshold
///
/// Once tripped the collaborator is treated as down for the rest of the run.
#[derive(Debug)]
pub struct OutageBreaker {
    threshold: u32,
    consecutive_failures: AtomicU32,
    tripped: AtomicBool,
}

impl OutageBreaker {
    /// A threshold of 0 disables the breaker
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            consecutive_failures: AtomicU32::new(0),
            tripped: AtomicBool::new(false),
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    /// Returns true when this failure tripped the breaker
    pub fn record_failure(&self) -> bool {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if self.threshold > 0 && failures >= self.threshold {
            return !self.tripped.swap(true, Ordering::SeqCst);
        }
        false
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    /// Re-arm for a new run
    pub fn reset(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.tripped.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    enum TestError {
        Flaky,
        Fatal,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Transient for TestError {
        fn is_transient(&self) -> bool {
            matches!(self, TestError::Flaky)
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff(1, None), Duration::from_millis(100));
        assert_eq!(policy.backoff(2, None), Duration::from_millis(200));
        assert_eq!(policy.backoff(3, None), Duration::from_millis(350));
        assert_eq!(
            policy.backoff(1, Some(Duration::from_millis(300))),
            Duration::from_millis(300)
        );
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, _> = fast_policy(3)
            .run("flaky", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TestError::Flaky)
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_run_out() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, _> = fast_policy(2)
            .run("down", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Flaky)
            })
            .await;
        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 3, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, _> = fast_policy(5)
            .run("fatal", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Fatal)
            })
            .await;
        assert!(matches!(result, Err(RetryError::Permanent(TestError::Fatal))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_ends_attempts() {
        let policy = RetryPolicy {
            timeout: Duration::from_millis(50),
            ..fast_policy(3)
        };
        let calls = AtomicUsize::new(0);
        let result: Result<u32, RetryError<TestError>> = policy
            .run("slow", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(1)
            })
            .await;
        assert!(matches!(result, Err(RetryError::TimedOut { attempts: 1, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_breaker_trips_once() {
        let breaker = OutageBreaker::new(2);
        assert!(!breaker.record_failure());
        breaker.record_success();
        assert!(!breaker.record_failure());
        assert!(breaker.record_failure());
        assert!(breaker.is_tripped());
        // Already tripped: further failures do not report a new trip
        assert!(!breaker.record_failure());

        breaker.reset();
        assert!(!breaker.is_tripped());
    }

    #[test]
    fn test_zero_threshold_never_trips() {
        let breaker = OutageBreaker::new(0);
        for _ in 0..10 {
            assert!(!breaker.record_failure());
        }
        assert!(!breaker.is_tripped());
    }
}
