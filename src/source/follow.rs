//! Bounded-wait pull over a live follow.
//!
//! A raw follow is a blocking, infinite byte-chunk producer. No runtime can
//! forcibly interrupt an arbitrary blocking call safely, so [`FollowStream`]
//! isolates the blocking read on the blocking pool and exposes a
//! **bounded-wait pull**: `pull(wait)` resolves within `wait` even when the
//! source is silent, which is what keeps session cancellation latency
//! bounded to one poll interval.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::SourceError;

/// Outcome of one bounded-wait pull.
#[derive(Debug)]
pub enum Pulled {
    /// A raw byte chunk arrived.
    Chunk(Vec<u8>),
    /// Nothing arrived within the bounded wait.
    Idle,
    /// The follow ended; the source will produce nothing more.
    Eof,
}

/// Cancellable pull interface over a live follow.
pub struct FollowStream {
    rx: mpsc::Receiver<Result<Vec<u8>, SourceError>>,
}

impl FollowStream {
    /// Wraps an already-async producer feeding the given channel.
    pub fn new(rx: mpsc::Receiver<Result<Vec<u8>, SourceError>>) -> Self {
        Self { rx }
    }

    /// Offloads a blocking iterator onto the blocking pool.
    ///
    /// The reader thread forwards each yielded item into a bounded channel
    /// and exits when the stream is dropped. Caveat, by contract rather than
    /// preference: the reader only notices the drop **after its next yield**,
    /// so while the source is silent the thread lingers inside the blocking
    /// read. Session-side cancellation latency stays bounded regardless,
    /// because [`FollowStream::pull`] never waits on the reader directly.
    pub fn from_blocking<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<Vec<u8>, SourceError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(64);
        tokio::task::spawn_blocking(move || {
            for item in iter {
                if tx.blocking_send(item).is_err() {
                    break;
                }
            }
        });
        Self { rx }
    }

    /// Pulls the next chunk, waiting at most `wait`.
    ///
    /// Returns [`Pulled::Idle`] when the wait elapses, [`Pulled::Eof`] when
    /// the producer hung up, and propagates source errors inline.
    pub async fn pull(&mut self, wait: Duration) -> Result<Pulled, SourceError> {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Err(_elapsed) => Ok(Pulled::Idle),
            Ok(None) => Ok(Pulled::Eof),
            Ok(Some(Ok(chunk))) => Ok(Pulled::Chunk(chunk)),
            Ok(Some(Err(e))) => Err(e),
        }
    }
}

impl std::fmt::Debug for FollowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowStream").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn pull_yields_chunks_then_eof() {
        let (tx, rx) = mpsc::channel(4);
        let mut stream = FollowStream::new(rx);

        tx.send(Ok(b"x\n".to_vec())).await.unwrap();
        drop(tx);

        match stream.pull(Duration::from_secs(1)).await.unwrap() {
            Pulled::Chunk(c) => assert_eq!(c, b"x\n"),
            other => panic!("expected chunk, got {other:?}"),
        }
        assert!(matches!(
            stream.pull(Duration::from_secs(1)).await.unwrap(),
            Pulled::Eof
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_producer_yields_idle_within_bound() {
        let (_tx, rx) = mpsc::channel::<Result<Vec<u8>, SourceError>>(4);
        let mut stream = FollowStream::new(rx);

        let before = tokio::time::Instant::now();
        let pulled = stream.pull(Duration::from_secs(1)).await.unwrap();
        assert!(matches!(pulled, Pulled::Idle));
        assert_eq!(before.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn errors_propagate_inline() {
        let (tx, rx) = mpsc::channel(4);
        let mut stream = FollowStream::new(rx);

        tx.send(Err(SourceError::transient("hiccup"))).await.unwrap();
        let err = stream.pull(Duration::from_secs(1)).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
