//! Stream session worker: the consume-buffer-flush loop.
//!
//! One [`StreamSession`] owns one batching buffer, one token bucket, and one
//! tail adapter, and drives them from a single spawned worker. The buffer
//! and cursor are single-writer (this worker); the registry's stop path only
//! signals the cancellation token and observes the state watch — it never
//! touches the buffer.
//!
//! ## Loop (Running)
//! ```text
//! loop {
//!   ├─► observe cancellation (top of iteration)
//!   ├─► adapter.pull()                 (cancellable, bounded wait)
//!   ├─► push lines into BatchBuffer
//!   └─► if should_flush:
//!         drain ─► try_consume(1):
//!           ├─ granted ─► chunk ─► sink.send per chunk ─► FlushDelivered
//!           └─ denied  ─► collapse to trailing window ─► one compact
//!                         notice + window ─► FlushCollapsed
//! }
//! ```
//!
//! ## Exit
//! Stop request, source exhaustion, or permanent source failure ends the
//! loop. The worker then performs one final drain+deliver that always
//! bypasses the collapse path, sends a stop notice, and transitions to
//! `Stopped`. Delivery failures anywhere are logged and that payload is
//! dropped; they never stop the session.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::buffer::{BatchBuffer, chunk_message, collapse_tail};
use crate::config::StreamConfig;
use crate::error::{DeliveryError, SourceError};
use crate::events::{Bus, Event, EventKind};
use crate::policies::TokenBucket;
use crate::session::state::{SessionState, SubscriberId};
use crate::sink::{Destination, NotificationSink};
use crate::source::{SourceRef, TailAdapter, TailPull};

/// Bytes reserved for the collapse notice line within one message.
const COLLAPSE_NOTICE_RESERVE: usize = 64;

/// Why the worker loop ended.
enum StopCause {
    /// A stop was requested (registry stop, replacement, or shutdown).
    Requested,
    /// The source ended normally.
    Exhausted,
    /// The source failed permanently (or retries exhausted).
    SourceLost(SourceError),
}

impl StopCause {
    fn as_label(&self) -> &'static str {
        match self {
            StopCause::Requested => "stop_requested",
            StopCause::Exhausted => "source_exhausted",
            StopCause::SourceLost(_) => "source_lost",
        }
    }

    fn notice(&self, source: &SourceRef) -> String {
        match self {
            StopCause::Requested => "Stream stopped.".to_string(),
            StopCause::Exhausted => format!("Stream ended: {source} produced no more output."),
            StopCause::SourceLost(e) => format!("Stream terminated: {e}"),
        }
    }
}

/// One active live-tail subscription, run as an independent worker.
pub(crate) struct StreamSession {
    subscriber: SubscriberId,
    destination: Destination,
    source_ref: SourceRef,
    adapter: TailAdapter,
    sink: Arc<dyn NotificationSink>,
    bus: Bus,
    cfg: StreamConfig,
    state_tx: watch::Sender<SessionState>,
}

impl StreamSession {
    /// Builds a session in `Starting` state and hands back the state watch.
    pub(crate) fn new(
        subscriber: SubscriberId,
        destination: Destination,
        adapter: TailAdapter,
        sink: Arc<dyn NotificationSink>,
        bus: Bus,
        cfg: StreamConfig,
    ) -> (Self, watch::Receiver<SessionState>) {
        let (state_tx, state_rx) = watch::channel(SessionState::Starting);
        let source_ref = adapter.source_ref().clone();
        (
            Self {
                subscriber,
                destination,
                source_ref,
                adapter,
                sink,
                bus,
                cfg,
                state_tx,
            },
            state_rx,
        )
    }

    /// Runs the worker until stop, source exhaustion, or permanent failure.
    ///
    /// The adapter connected before this session was registered, so there is
    /// no separate connect phase here: the first loop entry is the first
    /// successful contact and the session goes `Running` immediately.
    pub(crate) async fn run(mut self, cancel: CancellationToken) {
        let max_chunk = self.cfg.effective_message_size(self.sink.max_message_size());
        let mut buffer = BatchBuffer::new(
            self.cfg.max_lines,
            self.cfg.max_buffer_bytes,
            self.cfg.flush_interval,
        );
        let mut bucket = TokenBucket::new(self.cfg.bucket_capacity, self.cfg.refill_rate);

        self.transition(SessionState::Running, EventKind::SessionRunning, None);
        self.notify(&format!("Started streaming logs for {}", self.source_ref))
            .await;

        let cause = loop {
            if cancel.is_cancelled() {
                break StopCause::Requested;
            }
            match self.adapter.pull(&cancel).await {
                Ok(TailPull::Lines(lines)) => {
                    for line in lines {
                        buffer.push(line);
                    }
                }
                Ok(TailPull::Idle) => {}
                Ok(TailPull::Cancelled) => break StopCause::Requested,
                Ok(TailPull::Exhausted) => break StopCause::Exhausted,
                Err(e) => break StopCause::SourceLost(e),
            }

            let now = Instant::now();
            if buffer.should_flush(now) {
                self.flush(&mut buffer, &mut bucket, max_chunk, now).await;
            }
        };

        if let StopCause::SourceLost(e) = &cause {
            log::error!(
                "session {} lost source {}: {e}",
                self.subscriber,
                self.source_ref
            );
            self.bus.publish(
                Event::now(EventKind::SourceLost)
                    .with_subscriber(self.subscriber)
                    .with_source(self.source_ref.as_str())
                    .with_reason(e.to_string()),
            );
        }

        self.transition(
            SessionState::Stopping,
            EventKind::SessionStopping,
            Some(cause.as_label()),
        );

        // Final flush always attempts full delivery; the collapse path is
        // skipped by contract.
        self.final_flush(&mut buffer, max_chunk).await;
        self.notify(&cause.notice(&self.source_ref)).await;

        self.transition(
            SessionState::Stopped,
            EventKind::SessionStopped,
            Some(cause.as_label()),
        );
    }

    /// One rate-limited flush cycle: drain, then deliver or collapse.
    async fn flush(
        &self,
        buffer: &mut BatchBuffer,
        bucket: &mut TokenBucket,
        max_chunk: usize,
        now: Instant,
    ) {
        if buffer.is_empty() {
            return;
        }
        let total_lines = buffer.len();
        let text = buffer.drain(now);

        if bucket.try_consume(1.0) {
            self.deliver(&text, max_chunk, total_lines).await;
            return;
        }

        // Lossy backpressure: under sustained overload recency wins over
        // completeness. Keep the trailing window, drop the rest, say so.
        let budget = max_chunk.saturating_sub(COLLAPSE_NOTICE_RESERVE).max(1);
        let (window, dropped) = collapse_tail(&text, budget);
        let notice = if dropped > 0 {
            format!("[rate limited: {dropped} older lines dropped]")
        } else {
            "[rate limited]".to_string()
        };
        let payload = if window.is_empty() {
            notice
        } else {
            format!("{notice}\n{window}")
        };

        self.bus.publish(
            Event::now(EventKind::FlushCollapsed)
                .with_subscriber(self.subscriber)
                .with_lines(total_lines)
                .with_dropped(dropped),
        );
        if let Err(e) = self.sink.send(self.destination, &payload).await {
            self.report_delivery_failure(&e);
        }
    }

    /// Sends the full drained text, chunked under the sink cap.
    ///
    /// On the first failed chunk the remainder of this flush is dropped —
    /// there is no retry, so a failing sink cannot grow a backlog.
    async fn deliver(&self, text: &str, max_chunk: usize, total_lines: usize) {
        let chunks = chunk_message(text, max_chunk);
        let count = chunks.len();
        for chunk in &chunks {
            if let Err(e) = self.sink.send(self.destination, chunk).await {
                self.report_delivery_failure(&e);
                return;
            }
        }
        self.bus.publish(
            Event::now(EventKind::FlushDelivered)
                .with_subscriber(self.subscriber)
                .with_lines(total_lines)
                .with_attempt(count.min(u32::MAX as usize) as u32),
        );
    }

    /// Final drain+deliver; full delivery, no token accounting.
    async fn final_flush(&self, buffer: &mut BatchBuffer, max_chunk: usize) {
        if buffer.is_empty() {
            return;
        }
        let total_lines = buffer.len();
        let text = buffer.drain(Instant::now());
        self.deliver(&text, max_chunk, total_lines).await;
    }

    /// Best-effort one-line notice to the destination.
    async fn notify(&self, text: &str) {
        if let Err(e) = self.sink.send(self.destination, text).await {
            log::warn!(
                "session {} notice delivery failed: {e}",
                self.subscriber
            );
        }
    }

    fn report_delivery_failure(&self, err: &DeliveryError) {
        log::warn!(
            "session {} delivery failed ({}), payload dropped: {err}",
            self.subscriber,
            err.as_label()
        );
        self.bus.publish(
            Event::now(EventKind::DeliveryFailed)
                .with_subscriber(self.subscriber)
                .with_reason(err.to_string()),
        );
    }

    fn transition(&self, state: SessionState, kind: EventKind, reason: Option<&'static str>) {
        let _ = self.state_tx.send(state);
        let mut ev = Event::now(kind)
            .with_subscriber(self.subscriber)
            .with_source(self.source_ref.as_str());
        if let Some(reason) = reason {
            ev = ev.with_reason(reason);
        }
        self.bus.publish(ev);
    }
}
