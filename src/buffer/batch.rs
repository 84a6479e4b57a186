//! Batching buffer: accumulates produced lines and decides flush timing.
//!
//! [`BatchBuffer`] is single-writer by construction: only the owning session
//! worker pushes, inspects, and drains it. No locking is involved.
//!
//! ## Flush conditions
//! `should_flush(now)` is true when any of:
//! - buffered line count ≥ `max_lines`;
//! - buffered byte count ≥ `max_bytes`;
//! - `now - last_flush ≥ flush_interval` **and** the buffer is non-empty.
//!
//! The non-empty guard means an idle session produces no heartbeat traffic.

use std::time::Duration;
use tokio::time::Instant;

/// Ordered sequence of produced text lines awaiting flush.
#[derive(Debug)]
pub struct BatchBuffer {
    lines: Vec<String>,
    bytes: usize,
    max_lines: usize,
    max_bytes: usize,
    flush_interval: Duration,
    last_flush: Instant,
}

impl BatchBuffer {
    /// Creates an empty buffer; `last_flush` starts at `now`.
    pub fn new(max_lines: usize, max_bytes: usize, flush_interval: Duration) -> Self {
        Self {
            lines: Vec::new(),
            bytes: 0,
            max_lines: max_lines.max(1),
            max_bytes: max_bytes.max(1),
            flush_interval,
            last_flush: Instant::now(),
        }
    }

    /// Appends a line, updating the byte account.
    pub fn push(&mut self, line: String) {
        self.bytes += line.len();
        self.lines.push(line);
    }

    /// Number of buffered lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Total bytes across buffered lines (separators not counted).
    pub fn byte_len(&self) -> usize {
        self.bytes
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether a flush is due at `now`.
    pub fn should_flush(&self, now: Instant) -> bool {
        if self.lines.is_empty() {
            return false;
        }
        self.lines.len() >= self.max_lines
            || self.bytes >= self.max_bytes
            || now.saturating_duration_since(self.last_flush) >= self.flush_interval
    }

    /// Joins buffered lines with `\n`, clears the buffer, and stamps
    /// `last_flush = now`.
    pub fn drain(&mut self, now: Instant) -> String {
        let text = self.lines.join("\n");
        self.lines.clear();
        self.bytes = 0;
        self.last_flush = now;
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn buffer() -> BatchBuffer {
        BatchBuffer::new(10, 1000, Duration::from_secs(2))
    }

    #[tokio::test(start_paused = true)]
    async fn accounting_reflects_pushed_lines() {
        let mut buf = buffer();
        buf.push("alpha".into());
        buf.push("beta".into());
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.byte_len(), 9);

        buf.drain(Instant::now());
        assert!(buf.is_empty());
        assert_eq!(buf.byte_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_buffer_never_time_flushes() {
        let buf = buffer();
        advance(Duration::from_secs(3600)).await;
        assert!(!buf.should_flush(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn line_count_triggers_before_interval() {
        let mut buf = buffer();
        for i in 0..10 {
            buf.push(format!("line {i}"));
        }
        // no time has passed at all
        assert!(buf.should_flush(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn byte_count_triggers_before_interval() {
        let mut buf = buffer();
        buf.push("x".repeat(1000));
        assert!(buf.should_flush(Instant::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn time_based_flush_joins_in_order() {
        let mut buf = buffer();
        buf.push("a".into());
        buf.push("b".into());
        buf.push("c".into());
        assert!(!buf.should_flush(Instant::now()));

        advance(Duration::from_millis(2100)).await;
        let now = Instant::now();
        assert!(buf.should_flush(now));
        assert_eq!(buf.drain(now), "a\nb\nc");
    }

    #[tokio::test(start_paused = true)]
    async fn drain_resets_the_flush_clock() {
        let mut buf = buffer();
        buf.push("a".into());
        advance(Duration::from_secs(3)).await;
        buf.drain(Instant::now());

        buf.push("b".into());
        assert!(!buf.should_flush(Instant::now()));
    }
}
