//! Non-blocking fan-out over multiple event subscribers.
//!
//! [`SubscriberSet`] distributes each [`Event`] to every subscriber without
//! awaiting their processing.
//!
//! ## Guarantees
//! - `emit(&Event)` returns immediately.
//! - Per-subscriber FIFO (queue order).
//! - A panicking subscriber is caught and logged, never unwinds the worker.
//!
//! ## Not guaranteed
//! - No global ordering across different subscribers (use `Event::seq`).
//! - No retry on queue overflow: the event is dropped for that subscriber.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::events::Event;

use super::Subscribe;

/// Per-subscriber channel with its diagnostic name.
struct Lane {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
///
/// Workers are detached: dropping the set closes every queue, and each
/// worker exits after draining what it already accepted.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
}

impl SubscriberSet {
    /// Creates the set and spawns one worker per subscriber.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let mut lanes = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));

            tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await
                    {
                        log::error!(
                            "event subscriber '{}' panicked: {panic_err:?}",
                            sub.name()
                        );
                    }
                }
            });

            lanes.push(Lane { name, sender: tx });
        }

        Self { lanes }
    }

    /// Fans one event out to all subscribers (non-blocking).
    ///
    /// A full or closed queue drops the event for that subscriber only,
    /// with a warning naming it.
    pub fn emit(&self, event: &Event) {
        let shared = Arc::new(event.clone());
        for lane in &self.lanes {
            match lane.sender.try_send(Arc::clone(&shared)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("event subscriber '{}' queue full, event dropped", lane.name);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::warn!("event subscriber '{}' queue closed, event dropped", lane.name);
                }
            }
        }
    }

    /// Number of subscribers in the set.
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// True when the set has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        seen: AtomicUsize,
    }

    #[async_trait]
    impl Subscribe for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        async fn on_event(&self, _event: &Event) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn events_reach_every_subscriber() {
        let a = Arc::new(Counter { seen: AtomicUsize::new(0) });
        let b = Arc::new(Counter { seen: AtomicUsize::new(0) });
        let set = SubscriberSet::new(vec![a.clone(), b.clone()]);

        for _ in 0..3 {
            set.emit(&Event::now(EventKind::SessionRunning));
        }
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(a.seen.load(Ordering::SeqCst), 3);
        assert_eq!(b.seen.load(Ordering::SeqCst), 3);
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        fn name(&self) -> &'static str {
            "panicker"
        }

        async fn on_event(&self, _event: &Event) {
            panic!("boom");
        }
    }

    #[tokio::test]
    async fn panicking_subscriber_is_isolated() {
        let counter = Arc::new(Counter { seen: AtomicUsize::new(0) });
        let set = SubscriberSet::new(vec![Arc::new(Panicker) as _, counter.clone() as _]);

        set.emit(&Event::now(EventKind::SessionRunning));
        set.emit(&Event::now(EventKind::SessionStopped));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(counter.seen.load(Ordering::SeqCst), 2);
    }
}
