//! Streaming sessions: state machine, worker loop, and registry.
//!
//! The only public API from this module is [`SessionRegistry`] plus the
//! identity/state types; the worker itself is internal. The registry
//! enforces the single-active-session-per-subscriber invariant, the worker
//! owns all mutable per-session state.
//!
//! Internal modules:
//! - [`state`]: session identity and the forward-only state machine;
//! - [`worker`]: the consume-buffer-flush loop with collapse policy;
//! - [`registry`]: start/replace/stop with bounded synchronous waits, plus
//!   event-driven cleanup of self-terminated sessions.

mod registry;
mod state;
mod worker;

pub use registry::SessionRegistry;
pub use state::{SessionState, SubscriberId};

#[cfg(test)]
pub(crate) mod testkit {
    //! In-memory source and sink doubles for session-level tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use crate::error::{DeliveryError, SourceError};
    use crate::sink::{Destination, NotificationSink};
    use crate::source::{Cursor, FollowStream, LogSource, SourceRef};

    /// Poll-mode source replaying a canned script, one reply per poll.
    pub struct PollScript {
        tail_bytes: Vec<u8>,
        polls: Mutex<VecDeque<Vec<u8>>>,
    }

    impl PollScript {
        pub fn new(tail_bytes: &[u8], polls: Vec<&[u8]>) -> Self {
            Self {
                tail_bytes: tail_bytes.to_vec(),
                polls: Mutex::new(polls.into_iter().map(|p| p.to_vec()).collect()),
            }
        }

        /// A source that never produces anything.
        pub fn silent() -> Self {
            Self::new(b"", Vec::new())
        }
    }

    #[async_trait]
    impl LogSource for PollScript {
        async fn tail(&self, _source: &SourceRef, _limit: usize) -> Result<Vec<u8>, SourceError> {
            Ok(self.tail_bytes.clone())
        }

        async fn poll_since(
            &self,
            _source: &SourceRef,
            cursor: Cursor,
        ) -> Result<(Vec<u8>, Cursor), SourceError> {
            let raw = self.polls.lock().unwrap().pop_front().unwrap_or_default();
            Ok((raw, cursor))
        }
    }

    /// Follow-mode source handing out one externally fed stream.
    pub struct FollowOnce {
        rx: Mutex<Option<mpsc::Receiver<Result<Vec<u8>, SourceError>>>>,
    }

    impl FollowOnce {
        pub fn new(rx: mpsc::Receiver<Result<Vec<u8>, SourceError>>) -> Self {
            Self {
                rx: Mutex::new(Some(rx)),
            }
        }
    }

    #[async_trait]
    impl LogSource for FollowOnce {
        async fn tail(&self, _source: &SourceRef, _limit: usize) -> Result<Vec<u8>, SourceError> {
            Ok(Vec::new())
        }

        async fn follow(&self, _source: &SourceRef) -> Result<FollowStream, SourceError> {
            match self.rx.lock().unwrap().take() {
                Some(rx) => Ok(FollowStream::new(rx)),
                None => Err(SourceError::permanent("follow is not restartable")),
            }
        }
    }

    /// Source where nothing exists.
    pub struct MissingSource;

    #[async_trait]
    impl LogSource for MissingSource {
        async fn tail(&self, source: &SourceRef, _limit: usize) -> Result<Vec<u8>, SourceError> {
            Err(SourceError::NotFound {
                name: source.to_string(),
            })
        }
    }

    /// Poll source that connects fine, then hangs forever on every poll.
    pub struct StalledSource;

    #[async_trait]
    impl LogSource for StalledSource {
        async fn tail(&self, _source: &SourceRef, _limit: usize) -> Result<Vec<u8>, SourceError> {
            Ok(Vec::new())
        }

        async fn poll_since(
            &self,
            _source: &SourceRef,
            _cursor: Cursor,
        ) -> Result<(Vec<u8>, Cursor), SourceError> {
            std::future::pending().await
        }
    }

    /// Poll source replaying scripted results, errors included; empty after
    /// the script runs out.
    pub struct FlakyPoll {
        replies: Mutex<VecDeque<Result<Vec<u8>, SourceError>>>,
    }

    impl FlakyPoll {
        pub fn new(replies: Vec<Result<Vec<u8>, SourceError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl LogSource for FlakyPoll {
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

    /// Sink recording every delivered payload; can be switched to fail.
    pub struct RecordingSink {
        pub sent: Mutex<Vec<(i64, String)>>,
        pub failing: AtomicBool,
        max: usize,
    }

    impl RecordingSink {
        pub fn new(max: usize) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                failing: AtomicBool::new(false),
                max,
            }
        }

        pub fn messages(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, destination: Destination, text: &str) -> Result<(), DeliveryError> {
            if self.failing.load(Ordering::Relaxed) {
                return Err(DeliveryError::Failed {
                    error: "sink offline".into(),
                });
            }
            if text.len() > self.max {
                return Err(DeliveryError::Rejected {
                    len: text.len(),
                    max: self.max,
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((destination.value(), text.to_string()));
            Ok(())
        }

        fn max_message_size(&self) -> usize {
            self.max
        }
    }
}
