//! Bounded cooperative waits.
//!
//! Every wait in the crate goes through [`poll_until`]: a check is evaluated
//! repeatedly on a `tokio::time` schedule until it yields a value, errors, or
//! the deadline passes. Each individual check is itself bounded by the same
//! deadline, so a check that never answers cannot stall the caller.
//!
//! Fixed sleeps exist only as [`settle`], for the few widgets that animate
//! after a change and expose nothing to wait on.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::trace;

use crate::locator::DEFAULT_CANDIDATE_TIMEOUT_MS;
use crate::result::SondeoError;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default wait for a success signal (5 seconds)
pub const DEFAULT_SIGNAL_TIMEOUT_MS: u64 = 5000;

/// Default wait for an error signal (3 seconds)
pub const DEFAULT_ERROR_SIGNAL_TIMEOUT_MS: u64 = 3000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default navigation timeout (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for one bounded wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_SIGNAL_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// How a bounded wait ended
#[derive(Debug)]
pub enum WaitOutcome<T> {
    /// The check produced a value
    Ready(T),
    /// The check kept answering "not yet" until the deadline
    TimedOut,
    /// A check was still running when the deadline passed
    Stalled,
    /// The check raised
    Failed(SondeoError),
}

impl<T> WaitOutcome<T> {
    /// The value, if the wait succeeded
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the wait succeeded
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Poll `check` until it returns `Ok(Some(_))`, returns an error, or the
/// deadline passes.
///
/// The check always runs at least once, even with a zero timeout.
pub async fn poll_until<T, F, Fut>(options: &WaitOptions, mut check: F) -> WaitOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, SondeoError>>,
{
    let deadline = Instant::now() + options.timeout();
    let interval = options.poll_interval().max(Duration::from_millis(1));
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match timeout_at(deadline, check()).await {
            Err(_) => {
                trace!(attempts, "check still pending at deadline");
                return WaitOutcome::Stalled;
            }
            Ok(Err(err)) => return WaitOutcome::Failed(err),
            Ok(Ok(Some(value))) => return WaitOutcome::Ready(value),
            Ok(Ok(None)) => {}
        }
        let now = Instant::now();
        if now >= deadline {
            trace!(attempts, "condition not met before deadline");
            return WaitOutcome::TimedOut;
        }
        sleep_until((now + interval).min(deadline)).await;
    }
}

/// Documented fixed delay for widgets that re-render without an observable
/// ready state (radio-driven form sections, Select2 dropdowns).
pub async fn settle(delay: Duration) {
    if !delay.is_zero() {
        trace!(delay_ms = delay.as_millis() as u64, "settling");
        tokio::time::sleep(delay).await;
    }
}

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Every bound the resolver, classifier and page objects use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Per-candidate wait during resolution
    pub candidate: Duration,
    /// Wait for a success signal
    pub signal: Duration,
    /// Wait for an error signal
    pub error_signal: Duration,
    /// Polling interval for every wait
    pub poll_interval: Duration,
    /// Navigation bound
    pub navigation: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            candidate: Duration::from_millis(DEFAULT_CANDIDATE_TIMEOUT_MS),
            signal: Duration::from_millis(DEFAULT_SIGNAL_TIMEOUT_MS),
            error_signal: Duration::from_millis(DEFAULT_ERROR_SIGNAL_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            navigation: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
        }
    }
}

impl Timeouts {
    /// Create timeouts with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set per-candidate wait
    #[must_use]
    pub const fn with_candidate(mut self, timeout: Duration) -> Self {
        self.candidate = timeout;
        self
    }

    /// Set success-signal wait
    #[must_use]
    pub const fn with_signal(mut self, timeout: Duration) -> Self {
        self.signal = timeout;
        self
    }

    /// Set error-signal wait
    #[must_use]
    pub const fn with_error_signal(mut self, timeout: Duration) -> Self {
        self.error_signal = timeout;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set navigation bound
    #[must_use]
    pub const fn with_navigation(mut self, timeout: Duration) -> Self {
        self.navigation = timeout;
        self
    }

    /// Wait options for a bound of `timeout`
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(timeout.as_millis() as u64)
            .with_poll_interval(self.poll_interval.as_millis() as u64)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    mod options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let options = WaitOptions::default();
            assert_eq!(options.timeout(), Duration::from_secs(5));
            assert_eq!(options.poll_interval(), Duration::from_millis(100));
        }

        #[test]
        fn test_timeouts_builder() {
            let timeouts = Timeouts::new()
                .with_candidate(Duration::from_millis(250))
                .with_poll_interval(Duration::from_millis(50));
            let options = timeouts.wait(timeouts.candidate);
            assert_eq!(options.timeout_ms, 250);
            assert_eq!(options.poll_interval_ms, 50);
            assert_eq!(Timeouts::default().error_signal, Duration::from_secs(3));
        }
    }

    mod poll_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_ready_on_third_attempt() {
            let calls = AtomicU32::new(0);
            let options = WaitOptions::new().with_timeout(1000).with_poll_interval(100);
            let outcome = poll_until(&options, || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok::<_, SondeoError>((n == 3).then_some(n)) }
            })
            .await;
            assert_eq!(outcome.ready(), Some(3));
        }

        #[tokio::test(start_paused = true)]
        async fn test_times_out_within_bound() {
            let start = Instant::now();
            let options = WaitOptions::new().with_timeout(500).with_poll_interval(100);
            let outcome = poll_until(&options, || async { Ok::<_, SondeoError>(None::<()>) }).await;
            assert!(matches!(outcome, WaitOutcome::TimedOut));
            assert_eq!(start.elapsed(), Duration::from_millis(500));
        }

        #[tokio::test(start_paused = true)]
        async fn test_zero_timeout_checks_once() {
            let calls = AtomicU32::new(0);
            let options = WaitOptions::new().with_timeout(0);
            let outcome = poll_until(&options, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, SondeoError>(None::<()>) }
            })
            .await;
            assert!(matches!(outcome, WaitOutcome::TimedOut));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_error_stops_polling() {
            let calls = AtomicU32::new(0);
            let options = WaitOptions::new().with_timeout(1000);
            let outcome = poll_until(&options, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<Option<()>, _>(SondeoError::script("bad selector")) }
            })
            .await;
            assert!(matches!(outcome, WaitOutcome::Failed(_)));
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_hanging_check_is_stalled() {
            let start = Instant::now();
            let options = WaitOptions::new().with_timeout(300);
            let outcome = poll_until(&options, || async {
                std::future::pending::<()>().await;
                Ok::<_, SondeoError>(Some(()))
            })
            .await;
            assert!(matches!(outcome, WaitOutcome::Stalled));
            assert_eq!(start.elapsed(), Duration::from_millis(300));
        }

        #[tokio::test(start_paused = true)]
        async fn test_settle_sleeps_exactly() {
            let start = Instant::now();
            settle(Duration::from_millis(300)).await;
            assert_eq!(start.elapsed(), Duration::from_millis(300));
            settle(Duration::ZERO).await;
            assert_eq!(start.elapsed(), Duration::from_millis(300));
        }
    }
}
