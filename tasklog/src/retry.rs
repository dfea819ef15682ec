//! Retry configuration for version conflicts.
//!
//! When an append loses the optimistic concurrency race, the executor re-reads
//! the stream, re-validates the command against the fresh state and tries
//! again. `RetryPolicy` bounds how often that happens and how long to wait in
//! between.

use crate::StreamId;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(10);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(1);
const JITTER: f64 = 0.2;

/// Details of a single retry, reported to a [`MetricsHook`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryContext {
    /// 1-based retry number.
    pub attempt: u32,
    /// Backoff applied before this retry, in milliseconds.
    pub delay_ms: u64,
    /// Streams whose version conflict triggered the retry.
    pub streams: Vec<StreamId>,
}

/// Observer notified before each retry.
pub trait MetricsHook: Send + Sync {
    /// Called once per retry, before the backoff sleep.
    fn on_retry_attempt(&self, ctx: &RetryContext);
}

/// How many times, and how patiently, to retry on version conflicts.
///
/// Delays grow exponentially from `base_delay`, capped at `max_delay`, with
/// ±20% jitter so that racing writers spread out.
///
/// ```ignore
/// let policy = RetryPolicy::new()
///     .max_retries(5)
///     .base_delay(Duration::from_millis(20));
/// ```
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    metrics_hook: Option<Arc<dyn MetricsHook>>,
}

impl RetryPolicy {
    /// Policy with the default budget: 3 retries, 10ms base delay, 1s cap.
    pub const fn new() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            metrics_hook: None,
        }
    }

    /// Policy that surfaces the first conflict without retrying.
    pub const fn no_retries() -> Self {
        Self::new().max_retries(0)
    }

    /// Set the maximum number of retries after the first attempt.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry.
    #[must_use]
    pub const fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set the upper bound for any single backoff delay.
    #[must_use]
    pub const fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Attach an observer notified before every retry.
    #[must_use]
    pub fn with_metrics_hook<H: MetricsHook + 'static>(mut self, hook: H) -> Self {
        self.metrics_hook = Some(Arc::new(hook));
        self
    }

    /// Maximum number of retries after the first attempt.
    pub const fn retry_limit(&self) -> u32 {
        self.max_retries
    }

    /// Jittered backoff before retry number `attempt` (1-based).
    pub(crate) fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = rand::rng().random_range((1.0 - JITTER)..=(1.0 + JITTER));
        apply_jitter(
            exponential_delay(self.base_delay, self.max_delay, attempt),
            factor,
        )
    }

    pub(crate) fn notify_retry(&self, ctx: &RetryContext) {
        if let Some(hook) = &self.metrics_hook {
            hook.on_retry_attempt(ctx);
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("metrics_hook", &self.metrics_hook.is_some())
            .finish()
    }
}

fn exponential_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let multiplier = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
    base.saturating_mul(multiplier).min(max)
}

fn apply_jitter(delay: Duration, factor: f64) -> Duration {
    delay.mul_f64(factor)
}

pub fn duration_to_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
