//! Error types used by the streaming runtime and its collaborators.
//!
//! Three enums cover the failure taxonomy:
//!
//! - [`SourceError`] — failures of the external log source (tail/poll/follow).
//! - [`DeliveryError`] — failures of the notification sink.
//! - [`StreamError`] — errors raised by the session registry itself.
//!
//! All types provide `as_label` for logs and events; [`SourceError`] also
//! exposes [`SourceError::is_retryable`], which the tail adapter consults
//! before scheduling a retry.
//!
//! Overload (token bucket exhausted) is deliberately **not** an error: it is
//! a designed-for condition handled by the collapse policy in the session
//! worker.

use thiserror::Error;

/// Errors produced by the external log source.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// The requested source does not exist. Surfaced from `start`/`fetch_tail`
    /// before any session is created.
    ///
    /// The identifier is plain payload, not an error cause (a field named
    /// `source` would be claimed by the `Error::source` derive).
    #[error("source not found: {name}")]
    NotFound {
        /// The identifier that failed to resolve.
        name: String,
    },

    /// Read hiccup; safe to retry with backoff inside the adapter.
    #[error("transient source error: {error}")]
    Transient {
        /// The underlying error message.
        error: String,
    },

    /// Source is gone for good; forces the session into `Stopping`.
    #[error("permanent source error: {error}")]
    Permanent {
        /// The underlying error message.
        error: String,
    },
}

impl SourceError {
    /// Returns a short stable label (snake_case) for logs and events.
    pub fn as_label(&self) -> &'static str {
        match self {
            SourceError::NotFound { .. } => "source_not_found",
            SourceError::Transient { .. } => "source_transient",
            SourceError::Permanent { .. } => "source_permanent",
        }
    }

    /// True for errors the tail adapter may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Transient { .. })
    }

    /// Shorthand for a transient error with the given message.
    pub fn transient(error: impl Into<String>) -> Self {
        SourceError::Transient { error: error.into() }
    }

    /// Shorthand for a permanent error with the given message.
    pub fn permanent(error: impl Into<String>) -> Self {
        SourceError::Permanent { error: error.into() }
    }
}

/// Errors produced by the notification sink.
///
/// Delivery failures are never fatal to a session: the worker logs the
/// failure, drops that flush's payload, and continues. A flush is not
/// retried, so a slow sink cannot grow an unbounded backlog.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum DeliveryError {
    /// The sink rejected the payload (e.g. over its size cap).
    #[error("sink rejected payload of {len} bytes (max {max})")]
    Rejected {
        /// Payload length in bytes.
        len: usize,
        /// The sink's documented maximum.
        max: usize,
    },

    /// The send failed (network, upstream outage, ...).
    #[error("delivery failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },
}

impl DeliveryError {
    /// Returns a short stable label (snake_case) for logs and events.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::Rejected { .. } => "delivery_rejected",
            DeliveryError::Failed { .. } => "delivery_failed",
        }
    }
}

/// Errors produced by the session registry.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StreamError {
    /// The requested source does not exist; no session was created.
    #[error("source not found: {name}")]
    NotFound {
        /// The identifier that failed to resolve.
        name: String,
    },

    /// The source failed while connecting (retries already exhausted).
    #[error(transparent)]
    Source(SourceError),

    /// A one-shot delivery (tail fetch) failed at the sink.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl StreamError {
    /// Returns a short stable label (snake_case) for logs and events.
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamError::NotFound { .. } => "stream_not_found",
            StreamError::Source(e) => e.as_label(),
            StreamError::Delivery(e) => e.as_label(),
        }
    }

    /// Maps a connect-phase source error, lifting `NotFound` to its own variant.
    pub(crate) fn from_connect(err: SourceError) -> Self {
        match err {
            SourceError::NotFound { name } => StreamError::NotFound { name },
            other => StreamError::Source(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_is_retryable_others_are_not() {
        assert!(SourceError::transient("hiccup").is_retryable());
        assert!(!SourceError::permanent("gone").is_retryable());
        assert!(!SourceError::NotFound { name: "web".into() }.is_retryable());
    }

    #[test]
    fn not_found_identifier_is_payload_not_a_cause() {
        use std::error::Error as _;

        let err = SourceError::NotFound { name: "web".into() };
        assert_eq!(err.to_string(), "source not found: web");
        assert!(err.source().is_none());

        let err = StreamError::NotFound { name: "web".into() };
        assert_eq!(err.to_string(), "source not found: web");
        assert!(err.source().is_none());
    }

    #[test]
    fn connect_mapping_lifts_not_found() {
        let err = StreamError::from_connect(SourceError::NotFound { name: "web".into() });
        assert!(matches!(err, StreamError::NotFound { .. }));

        let err = StreamError::from_connect(SourceError::permanent("gone"));
        assert!(matches!(err, StreamError::Source(SourceError::Permanent { .. })));
    }
}
