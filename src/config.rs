//! Global streaming configuration.
//!
//! [`StreamConfig`] centralizes every tunable of the streaming core. All
//! fields have defaults; no operator input is required beyond identifying
//! the process to tail.
//!
//! Config is used in two ways:
//! 1. **Registry creation**: `SessionRegistry::new(config, source, sink, ...)`
//! 2. **Per-session wiring**: each worker builds its buffer, token bucket,
//!    and tail adapter from the registry's config.

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Configuration for the streaming session runtime.
///
/// ## Field semantics
/// - `poll_interval`: pacing of cursor polls and the bounded wait of
///   follow-mode pulls. Also bounds cancellation latency.
/// - `flush_interval`: maximum age of buffered lines before a time-based
///   flush (never fires on an empty buffer).
/// - `max_lines` / `max_buffer_bytes`: size-based flush triggers.
/// - `max_message_size`: outbound chunk cap; the effective cap is the
///   minimum of this and the sink's own documented maximum.
/// - `bucket_capacity` / `refill_rate`: per-session token bucket (one token
///   per flush; denial triggers the collapse policy).
/// - `max_source_retries`: consecutive transient source failures tolerated
///   before the source is declared permanently lost.
/// - `source_backoff`: delay schedule between those retries.
/// - `stop_grace`: how long the registry waits for a session to stop before
///   abandoning its handle (recommended: a few poll intervals).
/// - `bus_capacity`: ring-buffer size of the event broadcast channel.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Sleep between cursor polls; bounded wait for follow pulls.
    pub poll_interval: Duration,

    /// Time-based flush trigger (non-empty buffers only).
    pub flush_interval: Duration,

    /// Flush once this many lines are buffered.
    pub max_lines: usize,

    /// Flush once this many bytes are buffered.
    pub max_buffer_bytes: usize,

    /// Hard cap on a single outbound message, in bytes.
    pub max_message_size: usize,

    /// Token bucket capacity (burst budget, in flushes).
    pub bucket_capacity: f64,

    /// Token bucket refill rate, in tokens per second.
    pub refill_rate: f64,

    /// Consecutive transient source failures before giving up.
    pub max_source_retries: u32,

    /// Backoff schedule for transient source retries.
    pub source_backoff: BackoffPolicy,

    /// Bound on the registry's synchronous stop-before-start wait.
    pub stop_grace: Duration,

    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,
}

impl Default for StreamConfig {
    /// Defaults mirror a chat sink with a ~4 KiB payload cap:
    ///
    /// - `poll_interval = 1s`, `flush_interval = 2s`
    /// - `max_lines = 10`, `max_buffer_bytes = 1000`
    /// - `max_message_size = 3900` (safety margin under a 4096-byte sink cap)
    /// - `bucket_capacity = 5.0`, `refill_rate = 1.0`
    /// - `max_source_retries = 3`, exponential backoff 200ms..5s with equal jitter
    /// - `stop_grace = 3s` (three poll intervals)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            flush_interval: Duration::from_secs(2),
            max_lines: 10,
            max_buffer_bytes: 1000,
            max_message_size: 3900,
            bucket_capacity: 5.0,
            refill_rate: 1.0,
            max_source_retries: 3,
            source_backoff: BackoffPolicy::default(),
            stop_grace: Duration::from_secs(3),
            bus_capacity: 1024,
        }
    }
}

impl StreamConfig {
    /// Effective outbound chunk cap given the sink's own maximum.
    #[inline]
    pub fn effective_message_size(&self, sink_max: usize) -> usize {
        self.max_message_size.min(sink_max).max(1)
    }
}
