//! Wait Mechanisms
//!
//! Bounded-retry polling with push resumption. A wait re-checks its probe
//! until it reports ready, the probe's source is abandoned, or the deadline
//! passes. Between checks it suspends on whichever comes first: the poll
//! interval elapsing or a wake-up from the source's [`Notify`].

use crate::result::{ProbeError, ProbeResult};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds, counted from call entry
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
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

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// PROBE OUTCOME
// =============================================================================

/// Outcome of a single re-check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check<T> {
    /// Condition satisfied
    Ready(T),
    /// Not yet; check again later
    Pending,
    /// The observed source is gone; the condition can never become true
    Abandoned,
}

impl<T> From<Option<T>> for Check<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Pending, Self::Ready)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult<T> {
    /// Value produced by the satisfied probe
    pub value: T,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of times the probe ran
    pub attempts: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

// =============================================================================
// POLL ENGINE
// =============================================================================

/// Re-run `check` until it is ready, abandoned, or `options.timeout_ms` passes.
///
/// When `wake` is given, a notification on it triggers an early re-check.
/// The wake-up is registered before each check so a notification racing
/// with the check is never lost.
pub async fn poll_until<T, F>(
    description: &str,
    wake: Option<&Notify>,
    options: &WaitOptions,
    mut check: F,
) -> ProbeResult<WaitResult<T>>
where
    F: FnMut() -> Check<T>,
{
    let start = Instant::now();
    let deadline = start + options.timeout();
    let mut attempts = 0u32;

    loop {
        let mut notified = std::pin::pin!(wake.map(Notify::notified));
        if let Some(notified) = notified.as_mut().as_pin_mut() {
            let _ = notified.enable();
        }

        attempts += 1;
        match check() {
            Check::Ready(value) => {
                tracing::debug!(waited_for = description, attempts, "wait satisfied");
                return Ok(WaitResult {
                    value,
                    elapsed: start.elapsed(),
                    attempts,
                    waited_for: description.to_string(),
                });
            }
            Check::Abandoned => {
                tracing::debug!(waited_for = description, attempts, "wait abandoned");
                return Err(ProbeError::Cancelled {
                    kind: description.to_string(),
                });
            }
            Check::Pending => {}
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(
                waited_for = description,
                timeout_ms = options.timeout_ms,
                attempts,
                "wait timed out"
            );
            return Err(ProbeError::Timeout {
                kind: description.to_string(),
                ms: options.timeout_ms,
            });
        }

        let next = (now + options.poll_interval()).min(deadline);
        match notified.as_pin_mut() {
            Some(notified) => {
                tokio::select! {
                    () = notified => {}
                    () = tokio::time::sleep_until(next) => {}
                }
            }
            None => tokio::time::sleep_until(next).await,
        }
    }
}

/// Wait for a boolean predicate with the given options
pub async fn wait_until<F>(predicate: F, options: &WaitOptions) -> ProbeResult<Duration>
where
    F: Fn() -> bool,
{
    let result = poll_until("custom predicate", None, options, || {
        if predicate() {
            Check::Ready(())
        } else {
            Check::Pending
        }
    })
    .await?;
    Ok(result.elapsed)
}
