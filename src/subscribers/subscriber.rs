//! The event subscriber trait.

use async_trait::async_trait;

use crate::events::Event;

/// Hook into runtime events (logging, metrics, alerting, tests).
///
/// Subscribers are fanned out to by [`SubscriberSet`]
/// (crate::subscribers::SubscriberSet) over bounded per-subscriber queues:
/// a slow subscriber drops events for itself only and never backpressures
/// the sessions publishing them.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Stable name used in overflow/panic diagnostics.
    fn name(&self) -> &'static str;

    /// Capacity of this subscriber's event queue (clamped to ≥ 1).
    fn queue_capacity(&self) -> usize {
        256
    }

    /// Processes one event. Panics are caught and isolated.
    async fn on_event(&self, event: &Event);
}
