//! The external log source contract.
//!
//! [`LogSource`] abstracts whatever actually produces log bytes (a container
//! runtime, a file, a remote API). The streaming core consumes it through
//! the [`TailAdapter`](crate::source::TailAdapter) and never sees transport
//! details.
//!
//! Implementations may block internally; the `follow` path is expected to
//! isolate blocking reads via [`FollowStream::from_blocking`]
//! (crate::source::FollowStream::from_blocking).

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::source::follow::FollowStream;

/// Normalized handle for a process/log source.
///
/// The process registry collaborator is required to hand the streaming core
/// exactly this type; any client-specific object shapes are normalized
/// before they reach a session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceRef(Arc<str>);

impl SourceRef {
    /// Creates a handle from any string-like identifier.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// The underlying identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Opaque marker of consumption progress for poll-based sources.
///
/// Poll adapters ask for "everything since `cursor`" and advance the cursor
/// from the source's reply, so lines are never re-delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor(SystemTime);

impl Cursor {
    /// A cursor positioned at the current wall-clock time.
    pub fn now() -> Self {
        Self(SystemTime::now())
    }

    /// A cursor at an explicit position.
    pub fn at(t: SystemTime) -> Self {
        Self(t)
    }

    /// The wrapped position.
    pub fn position(&self) -> SystemTime {
        self.0
    }
}

/// Abstract log source consumed by the streaming core.
///
/// Two live-consumption shapes are supported, because real sources differ:
/// cursor polling ([`LogSource::poll_since`]) and blocking follow
/// ([`LogSource::follow`]). A source only needs to implement the mode(s) it
/// can actually provide; the default implementations report a permanent
/// "unsupported" error so a misconfigured mode fails loudly instead of
/// silently stalling.
#[async_trait]
pub trait LogSource: Send + Sync + 'static {
    /// Fetches the last `limit` lines as raw bytes.
    ///
    /// Fails with [`SourceError::NotFound`] when the source does not exist.
    async fn tail(&self, source: &SourceRef, limit: usize) -> Result<Vec<u8>, SourceError>;

    /// Returns all bytes produced since `cursor` plus the advanced cursor.
    ///
    /// Must be non-blocking-bounded: a call returns promptly even when no
    /// new output exists (with an empty byte vector).
    async fn poll_since(
        &self,
        source: &SourceRef,
        cursor: Cursor,
    ) -> Result<(Vec<u8>, Cursor), SourceError> {
        let _ = cursor;
        Err(SourceError::permanent(format!(
            "source {source} does not support cursor polling"
        )))
    }

    /// Opens an infinite, non-restartable live follow.
    async fn follow(&self, source: &SourceRef) -> Result<FollowStream, SourceError> {
        Err(SourceError::permanent(format!(
            "source {source} does not support follow"
        )))
    }
}
