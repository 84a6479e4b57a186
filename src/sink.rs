//! The notification sink contract.
//!
//! [`NotificationSink`] abstracts whatever delivers text to the operator
//! (a chat API, a webhook, stdout in the demos). Deliveries are subject to
//! the sink's documented payload cap; the streaming core chunks every
//! outbound batch under `min(config cap, sink cap)` before calling `send`.
//!
//! Transient delivery failures are the sink's to report and the session's
//! to tolerate: a failed flush is logged and dropped, never retried.

use std::fmt;

use async_trait::async_trait;

use crate::error::DeliveryError;

/// Opaque delivery target (a chat, a channel, a user).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Destination(i64);

impl Destination {
    /// Wraps a raw destination id.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw id.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Abstract delivery channel for formatted text blocks.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Delivers one text block to the destination.
    async fn send(&self, destination: Destination, text: &str) -> Result<(), DeliveryError>;

    /// The maximum payload length this sink accepts, in bytes.
    fn max_message_size(&self) -> usize;
}
