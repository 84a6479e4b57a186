//! Runtime events emitted by sessions, the tail adapter, and the registry.
//!
//! [`EventKind`] classifies events across four categories:
//! - **Session lifecycle**: starting, running, stopping, stopped, removed
//! - **Flush outcomes**: delivered, collapsed, delivery failed
//! - **Source health**: retry scheduled, source lost
//! - **Runtime anomalies**: stop grace exceeded, subscriber overflow/panic
//!
//! ## Ordering guarantees
//! Each event carries a globally unique sequence number (`seq`) that grows
//! monotonically. Use `seq` to restore exact order when events are observed
//! out of order across subscribers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::session::SubscriberId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Session lifecycle ===
    /// Session registered; worker not yet consuming.
    ///
    /// Sets: `subscriber`, `source`.
    SessionStarting,

    /// Worker entered its consume-buffer-flush loop.
    ///
    /// Sets: `subscriber`, `source`.
    SessionRunning,

    /// Session began its final drain+deliver cycle.
    ///
    /// Sets: `subscriber`, `reason` (stop cause).
    SessionStopping,

    /// Worker loop exited; the session is terminal.
    ///
    /// Sets: `subscriber`, `reason` (stop cause).
    SessionStopped,

    /// A start request displaced an existing session for the same subscriber.
    ///
    /// Sets: `subscriber`, `source` (the *old* source).
    SessionReplaced,

    /// Session entry removed from the registry (definition of destruction).
    ///
    /// Sets: `subscriber`.
    SessionRemoved,

    /// A stop was requested for an active session.
    ///
    /// Sets: `subscriber`.
    StopRequested,

    /// A session failed to stop within the grace period and was abandoned.
    ///
    /// Sets: `subscriber`, `delay_ms` (the grace bound).
    StopGraceExceeded,

    // === Flush outcomes ===
    /// A drained batch was sent in full.
    ///
    /// Sets: `subscriber`, `lines` (batch size), `attempt` (chunk count).
    FlushDelivered,

    /// The token bucket denied the flush; only the trailing window was sent.
    ///
    /// Sets: `subscriber`, `lines` (batch size), `dropped` (lines lost).
    FlushCollapsed,

    /// The sink failed a send; that payload was dropped.
    ///
    /// Sets: `subscriber`, `reason` (sink error).
    DeliveryFailed,

    // === Source health ===
    /// A transient source failure scheduled a retry.
    ///
    /// Sets: `source`, `attempt`, `delay_ms`, `reason`.
    SourceRetry,

    /// The source failed permanently (or retries exhausted).
    ///
    /// Sets: `subscriber`, `source`, `reason`.
    SourceLost,

    // === Subscriber plumbing ===
    /// An event subscriber panicked while processing an event.
    ///
    /// Sets: `reason` (panic info).
    SubscriberPanicked,

    /// An event subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason`.
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Owning subscriber, if applicable.
    pub subscriber: Option<SubscriberId>,
    /// Source reference being tailed, if applicable.
    pub source: Option<Arc<str>>,
    /// Human-readable reason (errors, stop causes, panic info).
    pub reason: Option<Arc<str>>,
    /// Lines involved in a flush.
    pub lines: Option<u32>,
    /// Lines discarded by a collapse.
    pub dropped: Option<u32>,
    /// Retry attempt number (1-based) or chunk count for a delivered flush.
    pub attempt: Option<u32>,
    /// Delay or grace bound in milliseconds (compact).
    pub delay_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next global sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            subscriber: None,
            source: None,
            reason: None,
            lines: None,
            dropped: None,
            attempt: None,
            delay_ms: None,
        }
    }

    /// Attaches the owning subscriber.
    #[inline]
    pub fn with_subscriber(mut self, id: SubscriberId) -> Self {
        self.subscriber = Some(id);
        self
    }

    /// Attaches the tailed source reference.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a flush line count.
    #[inline]
    pub fn with_lines(mut self, n: usize) -> Self {
        self.lines = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches a collapsed-drop count.
    #[inline]
    pub fn with_dropped(mut self, n: usize) -> Self {
        self.dropped = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches an attempt (or chunk) count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay or grace bound (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, cause: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} cause={cause}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::now(EventKind::SessionStarting);
        let b = Event::now(EventKind::SessionRunning);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_set_fields() {
        let ev = Event::now(EventKind::FlushCollapsed)
            .with_subscriber(SubscriberId::new(7))
            .with_lines(12)
            .with_dropped(9);
        assert_eq!(ev.subscriber, Some(SubscriberId::new(7)));
        assert_eq!(ev.lines, Some(12));
        assert_eq!(ev.dropped, Some(9));
    }
}
