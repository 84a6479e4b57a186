//! Rate limiting and retry policies.
//!
//! This module groups the knobs that control **how often** a session may
//! deliver and **how long** the adapter waits between source retries.
//!
//! ## Contents
//! - [`TokenBucket`] — per-session flush rate limiter (lazy refill)
//! - [`BackoffPolicy`] — how retry delays evolve (first / factor / max)
//! - [`JitterPolicy`] — randomization to avoid retry lockstep
//!
//! ## Quick wiring
//! ```text
//! StreamConfig { bucket_capacity, refill_rate, source_backoff, ... }
//!      ├─► session worker: TokenBucket::try_consume(1.0) per flush
//!      └─► TailAdapter: source_backoff.next(attempt) between retries
//! ```

mod backoff;
mod jitter;
mod rate;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use rate::TokenBucket;
