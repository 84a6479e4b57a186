//! Session registry: single-active-session-per-subscriber enforcement.
//!
//! The registry is the only owner of the subscriber→session mapping; every
//! other code path requests operations on it (start/stop) and never writes
//! the map directly.
//!
//! ## Architecture
//! ```text
//! start(subscriber, dest, source, mode)
//!   ├─► TailAdapter::connect()            (NotFound gate, no session yet)
//!   ├─► [write lock] remove prior session
//!   │       └─► cancel ─► join (bounded by stop_grace)
//!   ├─► spawn StreamSession worker
//!   └─► insert handle, release lock
//!
//! Bus ──► reaper listener
//!   └─► SessionStopped(subscriber) ─► remove entry if its worker is done
//! ```
//!
//! ## Rules
//! - The registry owns the handles (JoinHandle + CancellationToken).
//! - Replacement is atomic from the caller's view: the prior session reaches
//!   `Stopped` before the new one can reach `Running`.
//! - A stop wait is bounded by `stop_grace`; an overrun is logged and
//!   published, then the stuck handle is abandoned rather than hanging the
//!   caller.
//! - Self-terminated sessions (source exhausted/lost) are reaped via the
//!   event bus, so finished entries do not linger.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::buffer::chunk_message;
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::events::{Bus, Event, EventKind};
use crate::session::state::{SessionState, SubscriberId};
use crate::session::worker::StreamSession;
use crate::sink::{Destination, NotificationSink};
use crate::source::{LogSource, SourceRef, TailAdapter, TailMode, decode_lines};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Handle to one running session worker.
struct SessionHandle {
    /// The source the session is tailing (for replacement diagnostics).
    source_ref: SourceRef,
    /// Join handle for the worker.
    join: JoinHandle<()>,
    /// Cancellation token for this session only.
    cancel: CancellationToken,
    /// Worker-written state, observed by the registry and callers.
    state: watch::Receiver<SessionState>,
}

/// Creates, replaces, and destroys streaming sessions.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SubscriberId, SessionHandle>>,
    source: Arc<dyn LogSource>,
    sink: Arc<dyn NotificationSink>,
    bus: Bus,
    cfg: StreamConfig,
}

impl SessionRegistry {
    /// Creates a registry, wires the subscriber fan-out, and spawns the
    /// reaper listener.
    pub fn new(
        cfg: StreamConfig,
        source: Arc<dyn LogSource>,
        sink: Arc<dyn NotificationSink>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Arc<Self> {
        let bus = Bus::new(cfg.bus_capacity);
        let registry = Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            source,
            sink,
            bus,
            cfg,
        });

        let set = SubscriberSet::new(subscribers);
        if !set.is_empty() {
            registry.spawn_fanout(set);
        }
        registry.spawn_reaper();
        registry
    }

    /// The registry's event bus; subscribe for ad-hoc observation.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Starts a live streaming session, replacing any prior session owned by
    /// `subscriber`.
    ///
    /// The adapter connects first: a missing source fails here with
    /// [`StreamError::NotFound`] and leaves any existing session untouched.
    /// Replacement is synchronous — the prior session is `Stopped` (or its
    /// grace expired) before the new worker is spawned, so the
    /// one-session-per-subscriber invariant never transiently breaks.
    ///
    /// Returns a watch receiver observing the new session's state.
    pub async fn start(
        &self,
        subscriber: SubscriberId,
        destination: Destination,
        source_ref: SourceRef,
        mode: TailMode,
    ) -> Result<watch::Receiver<SessionState>, StreamError> {
        let adapter = TailAdapter::connect(
            Arc::clone(&self.source),
            source_ref.clone(),
            mode,
            &self.cfg,
            self.bus.clone(),
        )
        .await
        .map_err(StreamError::from_connect)?;

        let mut sessions = self.sessions.write().await;
        if let Some(old) = sessions.remove(&subscriber) {
            self.bus.publish(
                Event::now(EventKind::SessionReplaced)
                    .with_subscriber(subscriber)
                    .with_source(old.source_ref.as_str()),
            );
            self.halt(subscriber, old).await;
        }

        let (session, state_rx) = StreamSession::new(
            subscriber,
            destination,
            adapter,
            Arc::clone(&self.sink),
            self.bus.clone(),
            self.cfg.clone(),
        );
        self.bus.publish(
            Event::now(EventKind::SessionStarting)
                .with_subscriber(subscriber)
                .with_source(source_ref.as_str()),
        );

        let cancel = CancellationToken::new();
        let join = tokio::spawn(session.run(cancel.clone()));
        sessions.insert(
            subscriber,
            SessionHandle {
                source_ref,
                join,
                cancel,
                state: state_rx.clone(),
            },
        );
        Ok(state_rx)
    }

    /// Stops the subscriber's session, waiting (bounded) for termination.
    ///
    /// Returns `false` when no session was active — reported, not an error.
    pub async fn stop(&self, subscriber: SubscriberId) -> bool {
        let removed = self.sessions.write().await.remove(&subscriber);
        let Some(handle) = removed else {
            log::debug!("stop for subscriber {subscriber}: no active session");
            return false;
        };

        self.bus
            .publish(Event::now(EventKind::StopRequested).with_subscriber(subscriber));
        self.halt(subscriber, handle).await;
        self.bus
            .publish(Event::now(EventKind::SessionRemoved).with_subscriber(subscriber));
        true
    }

    /// Stops every active session (graceful shutdown path).
    pub async fn shutdown(&self) {
        let handles: Vec<(SubscriberId, SessionHandle)> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().collect()
        };

        for (_, handle) in &handles {
            handle.cancel.cancel();
        }
        for (subscriber, handle) in handles {
            self.halt(subscriber, handle).await;
            self.bus
                .publish(Event::now(EventKind::SessionRemoved).with_subscriber(subscriber));
        }
    }

    /// Sorted list of subscribers with an active session.
    pub async fn active(&self) -> Vec<SubscriberId> {
        let sessions = self.sessions.read().await;
        let mut ids: Vec<SubscriberId> = sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Current state of the subscriber's session, if one exists.
    pub async fn state_of(&self, subscriber: SubscriberId) -> Option<SessionState> {
        let sessions = self.sessions.read().await;
        sessions.get(&subscriber).map(|h| *h.state.borrow())
    }

    /// One-shot bounded tail fetch: decode, chunk, and send the last `limit`
    /// lines to the destination.
    ///
    /// Sends a `"(no logs yet)"` placeholder when the source has produced
    /// nothing.
    pub async fn fetch_tail(
        &self,
        destination: Destination,
        source_ref: &SourceRef,
        limit: usize,
    ) -> Result<(), StreamError> {
        let raw = self
            .source
            .tail(source_ref, limit)
            .await
            .map_err(StreamError::from_connect)?;

        let lines = decode_lines(&raw);
        if lines.is_empty() {
            self.sink
                .send(destination, "(no logs yet)")
                .await
                .map_err(StreamError::Delivery)?;
            return Ok(());
        }

        let max_chunk = self.cfg.effective_message_size(self.sink.max_message_size());
        for chunk in chunk_message(&lines.join("\n"), max_chunk) {
            self.sink
                .send(destination, &chunk)
                .await
                .map_err(StreamError::Delivery)?;
        }
        Ok(())
    }

    /// Cancels a session and waits for its worker, bounded by `stop_grace`.
    ///
    /// On overrun the handle is abandoned (the detached worker keeps its
    /// final-flush chance) and the anomaly is logged and published; the
    /// caller proceeds rather than hanging.
    async fn halt(&self, subscriber: SubscriberId, handle: SessionHandle) {
        handle.cancel.cancel();
        let grace = self.cfg.stop_grace;
        match tokio::time::timeout(grace, handle.join).await {
            Ok(Ok(())) => {}
            Ok(Err(join_err)) if join_err.is_panic() => {
                log::error!("session {subscriber} worker panicked during stop");
            }
            Ok(Err(_)) => {}
            Err(_elapsed) => {
                log::error!(
                    "session {subscriber} did not stop within {grace:?}; abandoning handle"
                );
                self.bus.publish(
                    Event::now(EventKind::StopGraceExceeded)
                        .with_subscriber(subscriber)
                        .with_delay(grace),
                );
            }
        }
    }

    /// Forwards bus events to the subscriber set (fire-and-forget).
    fn spawn_fanout(&self, set: SubscriberSet) {
        log::debug!("event fan-out serving {} subscriber(s)", set.len());
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        set.emit(&Event::subscriber_overflow("fanout", "bus_lagged"));
                        log::warn!("event fan-out lagged, skipped {n} events");
                    }
                }
            }
        });
    }

    /// Reaps sessions that terminated on their own (source exhausted/lost).
    ///
    /// Holds only a weak reference so the listener cannot keep the registry
    /// alive; it exits when the registry is gone or the bus closes.
    fn spawn_reaper(self: &Arc<Self>) {
        let mut rx = self.bus.subscribe();
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) if ev.kind == EventKind::SessionStopped => {
                        let Some(registry) = weak.upgrade() else { break };
                        if let Some(subscriber) = ev.subscriber {
                            registry.reap(subscriber).await;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        });
    }

    /// Removes the subscriber's entry if its worker already reached
    /// `Stopped`. A replacement session under the same id is left alone.
    async fn reap(&self, subscriber: SubscriberId) {
        let handle = {
            let mut sessions = self.sessions.write().await;
            let stopped = sessions
                .get(&subscriber)
                .is_some_and(|h| h.state.borrow().is_terminal());
            if !stopped {
                return;
            }
            sessions.remove(&subscriber)
        };

        if let Some(handle) = handle {
            if let Err(join_err) = handle.join.await {
                if join_err.is_panic() {
                    log::error!("session {subscriber} worker panicked");
                }
            }
            self.bus
                .publish(Event::now(EventKind::SessionRemoved).with_subscriber(subscriber));
        }
    }
}
