//! Backoff policy for retrying transient source failures.
//!
//! [`BackoffPolicy`] controls how retry delays grow after consecutive
//! failures:
//! - [`BackoffPolicy::factor`] — multiplicative growth factor;
//! - [`BackoffPolicy::first`] — initial delay;
//! - [`BackoffPolicy::max`] — maximum delay cap.
//!
//! The delay for attempt `n` (0-indexed) is `first × factor^n`, clamped to
//! `max`, then jitter is applied. The base is derived purely from the
//! attempt number, so jitter output never feeds back into subsequent
//! calculations and delays cannot drift downward over time.

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy for the tail adapter.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Initial delay before the first retry.
    pub first: Duration,
    /// Maximum delay cap for retries.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter policy applied to the computed delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns the source-retry schedule used by [`StreamConfig::default`]
    /// (crate::StreamConfig): `first = 200ms`, `factor = 2.0`, `max = 5s`,
    /// equal jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(200),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given attempt number (0-indexed).
    ///
    /// The base delay is `first × factor^attempt`, clamped to
    /// [`BackoffPolicy::max`]; jitter is applied to the clamped base.
    ///
    /// Non-finite or negative intermediate values clamp to `max`, so a
    /// misconfigured factor can slow retries down but never speed them up.
    pub fn next(&self, attempt: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = attempt.min(i32::MAX as u32) as i32;
        let unclamped = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !unclamped.is_finite() || unclamped < 0.0 || unclamped > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(unclamped)
        };

        self.jitter.apply(base)
    }
}
