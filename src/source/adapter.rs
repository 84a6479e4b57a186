//! Tail adapter: cancellable pull interface over a log source.
//!
//! [`TailAdapter`] wraps the external [`LogSource`] behind one pull
//! interface with two consumption modes:
//!
//! - **Cursor-poll** ([`TailMode::Poll`]): sleep `poll_interval`, ask for
//!   everything since the cursor, advance it, hand the lines straight back.
//!   Cancellation latency is bounded by one poll interval because each call
//!   is non-blocking-bounded.
//! - **Follow-pull** ([`TailMode::Follow`]): pull from a
//!   [`FollowStream`](crate::source::FollowStream) with a bounded wait of
//!   one poll interval, so the session's cancellation check runs at least
//!   once per interval even when the source is silent. Chunks need not be
//!   line-aligned: a trailing partial line is carried over until its
//!   remainder (or end of stream) arrives.
//!
//! Both modes decode bytes permissively (invalid UTF-8 is replaced, never
//! fatal) and discard blank lines before handing text to the session.
//!
//! ## Retry rules
//! Transient source errors are retried here, invisibly to the session,
//! with the configured backoff, up to `max_source_retries` consecutive
//! failures. Exhaustion — and a `NotFound` that appears mid-stream — are
//! escalated to a permanent error, which forces the session into
//! `Stopping`.

use std::sync::Arc;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::config::StreamConfig;
use crate::error::SourceError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::BackoffPolicy;
use crate::source::follow::{FollowStream, Pulled};
use crate::source::log_source::{Cursor, LogSource, SourceRef};

/// Which consumption shape the underlying source provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TailMode {
    /// Repeated `poll_since` calls with a cursor.
    Poll,
    /// A live follow pulled with a bounded wait.
    Follow,
}

/// Outcome of one adapter pull.
#[derive(Debug)]
pub enum TailPull {
    /// Decoded, non-blank lines in production order.
    Lines(Vec<String>),
    /// The source produced nothing this cycle.
    Idle,
    /// The cancellation token fired during the pull.
    Cancelled,
    /// The source ended normally; no more lines will ever arrive.
    Exhausted,
}

enum ModeState {
    Poll {
        cursor: Cursor,
    },
    Follow {
        stream: FollowStream,
        /// Trailing bytes of the last chunk that ended mid-line.
        carry: Vec<u8>,
    },
}

/// Cancellable pull interface owned by one session worker.
pub struct TailAdapter {
    source: Arc<dyn LogSource>,
    source_ref: SourceRef,
    state: ModeState,
    poll_interval: std::time::Duration,
    backoff: BackoffPolicy,
    max_retries: u32,
    /// Consecutive transient failures seen in follow mode.
    failures: u32,
    bus: Bus,
}

impl TailAdapter {
    /// Makes first contact with the source and returns a ready adapter.
    ///
    /// This is the `NotFound` gate: a missing source fails here, before any
    /// session is registered. Poll mode probes with a one-line tail fetch;
    /// follow mode opens the follow itself.
    pub(crate) async fn connect(
        source: Arc<dyn LogSource>,
        source_ref: SourceRef,
        mode: TailMode,
        cfg: &StreamConfig,
        bus: Bus,
    ) -> Result<Self, SourceError> {
        let state = match mode {
            TailMode::Poll => {
                source.tail(&source_ref, 1).await?;
                ModeState::Poll { cursor: Cursor::now() }
            }
            TailMode::Follow => ModeState::Follow {
                stream: source.follow(&source_ref).await?,
                carry: Vec::new(),
            },
        };
        Ok(Self {
            source,
            source_ref,
            state,
            poll_interval: cfg.poll_interval,
            backoff: cfg.source_backoff,
            max_retries: cfg.max_source_retries,
            failures: 0,
            bus,
        })
    }

    /// The source reference this adapter is tailing.
    pub fn source_ref(&self) -> &SourceRef {
        &self.source_ref
    }

    /// Pulls the next batch of lines, honoring the cancellation contract:
    /// the token is observed before the pull, inside the pacing sleep,
    /// inside every retry sleep, and inside the bounded wait, so latency
    /// never exceeds one poll interval.
    pub(crate) async fn pull(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<TailPull, SourceError> {
        if cancel.is_cancelled() {
            return Ok(TailPull::Cancelled);
        }
        match &self.state {
            ModeState::Poll { .. } => self.pull_poll(cancel).await,
            ModeState::Follow { .. } => self.pull_follow(cancel).await,
        }
    }

    async fn pull_poll(&mut self, cancel: &CancellationToken) -> Result<TailPull, SourceError> {
        let ModeState::Poll { cursor } = &self.state else {
            unreachable!("pull_poll outside poll mode");
        };
        let cursor = *cursor;

        // Pace before polling, so fetched lines reach the session's buffer
        // without sitting out an extra interval here.
        tokio::select! {
            _ = sleep(self.poll_interval) => {}
            _ = cancel.cancelled() => return Ok(TailPull::Cancelled),
        }

        let mut attempt: u32 = 0;
        let (raw, next_cursor) = loop {
            match self.source.poll_since(&self.source_ref, cursor).await {
                Ok(out) => break out,
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff.next(attempt);
                    attempt += 1;
                    self.report_retry(attempt, delay, &e);
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = cancel.cancelled() => return Ok(TailPull::Cancelled),
                    }
                }
                Err(e) => return Err(escalate(e)),
            }
        };

        self.state = ModeState::Poll { cursor: next_cursor };
        let lines = decode_lines(&raw);
        if lines.is_empty() {
            Ok(TailPull::Idle)
        } else {
            Ok(TailPull::Lines(lines))
        }
    }

    async fn pull_follow(&mut self, cancel: &CancellationToken) -> Result<TailPull, SourceError> {
        let wait = self.poll_interval;
        let ModeState::Follow { stream, carry } = &mut self.state else {
            unreachable!("pull_follow outside follow mode");
        };

        let pulled = tokio::select! {
            _ = cancel.cancelled() => return Ok(TailPull::Cancelled),
            res = stream.pull(wait) => res,
        };

        match pulled {
            Ok(Pulled::Chunk(raw)) => {
                self.failures = 0;
                // Chunks are not line-aligned: hold back the trailing
                // partial line until its remainder arrives.
                carry.extend_from_slice(&raw);
                let Some(pos) = carry.iter().rposition(|&b| b == b'\n') else {
                    return Ok(TailPull::Idle);
                };
                let rest = carry.split_off(pos + 1);
                let complete = std::mem::replace(carry, rest);
                let lines = decode_lines(&complete);
                if lines.is_empty() {
                    Ok(TailPull::Idle)
                } else {
                    Ok(TailPull::Lines(lines))
                }
            }
            Ok(Pulled::Idle) => Ok(TailPull::Idle),
            Ok(Pulled::Eof) => {
                // An unterminated final line still counts.
                let leftover = std::mem::take(carry);
                let lines = decode_lines(&leftover);
                if lines.is_empty() {
                    Ok(TailPull::Exhausted)
                } else {
                    Ok(TailPull::Lines(lines))
                }
            }
            Err(e) if e.is_retryable() && self.failures < self.max_retries => {
                self.failures += 1;
                let delay = self.backoff.next(self.failures - 1);
                self.report_retry(self.failures, delay, &e);
                tokio::select! {
                    _ = sleep(delay) => Ok(TailPull::Idle),
                    _ = cancel.cancelled() => Ok(TailPull::Cancelled),
                }
            }
            Err(e) => Err(escalate(e)),
        }
    }

    fn report_retry(&self, attempt: u32, delay: std::time::Duration, err: &SourceError) {
        log::warn!(
            "source {} transient failure (attempt {attempt}/{}): {err}; retrying in {delay:?}",
            self.source_ref,
            self.max_retries,
        );
        self.bus.publish(
            Event::now(EventKind::SourceRetry)
                .with_source(self.source_ref.as_str())
                .with_attempt(attempt)
                .with_delay(delay)
                .with_reason(err.to_string()),
        );
    }
}

/// Escalates a non-retryable (or retry-exhausted) error to permanent.
fn escalate(err: SourceError) -> SourceError {
    match err {
        e @ SourceError::Permanent { .. } => e,
        SourceError::NotFound { name } => {
            SourceError::permanent(format!("source {name} disappeared mid-stream"))
        }
        SourceError::Transient { error } => {
            SourceError::permanent(format!("source retries exhausted: {error}"))
        }
    }
}

/// Permissively decodes raw bytes into non-blank lines.
///
/// Invalid UTF-8 is replaced, trailing whitespace is stripped, and blank
/// lines are discarded.
pub(crate) fn decode_lines(raw: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(raw)
        .lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[test]
    fn decode_replaces_invalid_and_drops_blanks() {
        let raw = b"alpha\n\n  \nbeta\xff\ngamma\r\n";
        let lines = decode_lines(raw);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "alpha");
        assert!(lines[1].starts_with("beta"));
        assert_eq!(lines[2], "gamma");
    }

    /// Scripted poll source: each call pops the next canned reply.
    struct ScriptedPoll {
        replies: Mutex<VecDeque<Result<Vec<u8>, SourceError>>>,
    }

    impl ScriptedPoll {
        fn new(replies: Vec<Result<Vec<u8>, SourceError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }
    }

    #[async_trait]
    impl LogSource for ScriptedPoll {
        async fn tail(&self, _source: &SourceRef, _limit: usize) -> Result<Vec<u8>, SourceError> {
            Ok(Vec::new())
        }

        async fn poll_since(
            &self,
            _source: &SourceRef,
            cursor: Cursor,
        ) -> Result<(Vec<u8>, Cursor), SourceError> {
            let next = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Vec::new()));
            next.map(|raw| (raw, cursor))
        }
    }

    fn fast_cfg() -> StreamConfig {
        StreamConfig {
            source_backoff: BackoffPolicy {
                first: Duration::from_millis(10),
                max: Duration::from_millis(50),
                factor: 2.0,
                jitter: crate::policies::JitterPolicy::None,
            },
            ..StreamConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_poll_errors_are_retried_invisibly() {
        let source = ScriptedPoll::new(vec![
            Err(SourceError::transient("blip")),
            Ok(b"recovered\n".to_vec()),
        ]);
        let cfg = fast_cfg();
        let bus = Bus::new(16);
        let mut adapter = TailAdapter::connect(
            source,
            SourceRef::from("web"),
            TailMode::Poll,
            &cfg,
            bus.clone(),
        )
        .await
        .unwrap();

        let cancel = CancellationToken::new();
        match adapter.pull(&cancel).await.unwrap() {
            TailPull::Lines(lines) => assert_eq!(lines, vec!["recovered".to_string()]),
            other => panic!("expected lines, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_become_permanent() {
        let source = ScriptedPoll::new(vec![
            Err(SourceError::transient("blip")),
            Err(SourceError::transient("blip")),
            Err(SourceError::transient("blip")),
            Err(SourceError::transient("blip")),
        ]);
        let cfg = StreamConfig {
            max_source_retries: 3,
            ..fast_cfg()
        };
        let bus = Bus::new(16);
        let mut adapter = TailAdapter::connect(
            source,
            SourceRef::from("web"),
            TailMode::Poll,
            &cfg,
            bus,
        )
        .await
        .unwrap();

        let cancel = CancellationToken::new();
        let err = adapter.pull(&cancel).await.unwrap_err();
        assert!(matches!(err, SourceError::Permanent { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_short_circuits_the_pull() {
        let source = ScriptedPoll::new(vec![Ok(b"last words\n".to_vec())]);
        let cfg = fast_cfg();
        let bus = Bus::new(16);
        let mut adapter = TailAdapter::connect(
            source,
            SourceRef::from("web"),
            TailMode::Poll,
            &cfg,
            bus,
        )
        .await
        .unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        // already cancelled before the pull
        assert!(matches!(
            adapter.pull(&cancel).await.unwrap(),
            TailPull::Cancelled
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn fetched_lines_return_without_extra_delay() {
        let source = ScriptedPoll::new(vec![Ok(b"fresh\n".to_vec())]);
        let cfg = fast_cfg();
        let bus = Bus::new(16);
        let mut adapter = TailAdapter::connect(
            source,
            SourceRef::from("web"),
            TailMode::Poll,
            &cfg,
            bus,
        )
        .await
        .unwrap();

        let cancel = CancellationToken::new();
        let before = tokio::time::Instant::now();
        match adapter.pull(&cancel).await.unwrap() {
            TailPull::Lines(lines) => assert_eq!(lines, vec!["fresh".to_string()]),
            other => panic!("expected lines, got {other:?}"),
        }
        // one pacing interval, nothing more between fetch and return
        assert_eq!(before.elapsed(), cfg.poll_interval);
    }

    /// Follow-mode source handing out one externally fed stream.
    struct FollowHandout {
        rx: Mutex<Option<mpsc::Receiver<Result<Vec<u8>, SourceError>>>>,
    }

    #[async_trait]
    impl LogSource for FollowHandout {
        async fn tail(&self, _source: &SourceRef, _limit: usize) -> Result<Vec<u8>, SourceError> {
            Ok(Vec::new())
        }

        async fn follow(&self, _source: &SourceRef) -> Result<FollowStream, SourceError> {
            let rx = self.rx.lock().unwrap().take().expect("follow opened twice");
            Ok(FollowStream::new(rx))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn follow_chunks_split_mid_line_are_reassembled() {
        let (tx, rx) = mpsc::channel(8);
        let source = Arc::new(FollowHandout {
            rx: Mutex::new(Some(rx)),
        });
        let cfg = fast_cfg();
        let mut adapter = TailAdapter::connect(
            source,
            SourceRef::from("web"),
            TailMode::Follow,
            &cfg,
            Bus::new(16),
        )
        .await
        .unwrap();
        let cancel = CancellationToken::new();

        tx.send(Ok(b"par".to_vec())).await.unwrap();
        assert!(matches!(
            adapter.pull(&cancel).await.unwrap(),
            TailPull::Idle
        ));

        tx.send(Ok(b"tial\nnext ".to_vec())).await.unwrap();
        match adapter.pull(&cancel).await.unwrap() {
            TailPull::Lines(lines) => assert_eq!(lines, vec!["partial".to_string()]),
            other => panic!("expected lines, got {other:?}"),
        }

        // the unterminated final line surfaces when the follow ends
        drop(tx);
        match adapter.pull(&cancel).await.unwrap() {
            TailPull::Lines(lines) => assert_eq!(lines, vec!["next".to_string()]),
            other => panic!("expected lines, got {other:?}"),
        }
        assert!(matches!(
            adapter.pull(&cancel).await.unwrap(),
            TailPull::Exhausted
        ));
    }
}
