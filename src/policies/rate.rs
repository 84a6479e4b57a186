//! Token bucket rate limiter for outbound flushes.
//!
//! One [`TokenBucket`] exists per session; buckets are never shared, so no
//! locking is needed. Refill is **lazy**: computed from elapsed time on each
//! consumption attempt, never via a background timer.
//!
//! A flush costs one token. When the bucket is empty the session does not
//! wait — it applies the collapse policy (trailing window + notice) instead,
//! so overload bounds both memory and chat traffic.

use tokio::time::Instant;

/// Per-session token bucket.
///
/// Invariant: `0 <= tokens <= capacity` at all times. `try_consume` never
/// blocks and never errs.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Creates a bucket starting at full capacity.
    ///
    /// Negative or non-finite inputs are clamped to zero.
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        let capacity = if capacity.is_finite() && capacity > 0.0 {
            capacity
        } else {
            0.0
        };
        let refill_rate = if refill_rate.is_finite() && refill_rate > 0.0 {
            refill_rate
        } else {
            0.0
        };
        Self {
            capacity,
            refill_rate,
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    /// Attempts to consume `amount` tokens; returns whether the permit was
    /// granted.
    ///
    /// The refill from elapsed time is applied either way; on denial the
    /// balance is otherwise untouched.
    pub fn try_consume(&mut self, amount: f64) -> bool {
        self.try_consume_at(amount, Instant::now())
    }

    fn try_consume_at(&mut self, amount: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= amount {
            self.tokens -= amount;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn full_capacity_grants_exactly_capacity_permits() {
        let mut bucket = TokenBucket::new(5.0, 1.0);
        for _ in 0..5 {
            assert!(bucket.try_consume(1.0));
        }
        assert!(!bucket.try_consume(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn refill_grants_one_more_after_one_over_rate_seconds() {
        let mut bucket = TokenBucket::new(5.0, 1.0);
        for _ in 0..5 {
            assert!(bucket.try_consume(1.0));
        }
        assert!(!bucket.try_consume(1.0));

        advance(Duration::from_secs(1)).await;
        assert!(bucket.try_consume(1.0));
        assert!(!bucket.try_consume(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn tokens_never_exceed_capacity() {
        let mut bucket = TokenBucket::new(2.0, 10.0);
        advance(Duration::from_secs(60)).await;
        assert!(bucket.try_consume(1.0));
        assert!(bucket.try_consume(1.0));
        assert!(!bucket.try_consume(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn denial_keeps_balance_for_smaller_requests() {
        let mut bucket = TokenBucket::new(3.0, 0.5);
        assert!(!bucket.try_consume(5.0));
        // denial left the 3 tokens in place
        assert!(bucket.try_consume(3.0));
    }

    #[tokio::test(start_paused = true)]
    async fn fractional_refill_accumulates() {
        let mut bucket = TokenBucket::new(1.0, 2.0);
        assert!(bucket.try_consume(1.0));
        assert!(!bucket.try_consume(1.0));

        advance(Duration::from_millis(500)).await;
        assert!(bucket.try_consume(1.0));
    }
}
