//! # tailcast
//!
//! **Tailcast** turns unbounded, bursty log tails into rate-limited,
//! size-capped chat messages.
//!
//! It provides the streaming core for notification bots that follow live
//! process output: per-subscriber sessions that consume a log source,
//! batch lines, chunk them under a sink's payload cap, and degrade
//! gracefully (by dropping, visibly) when the source outpaces the
//! delivery budget.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//!     │  subscriber 1 │   │  subscriber 2 │   │  subscriber N │
//!     │  start("web") │   │  start("db")  │   │  stop()       │
//!     └───────┬───────┘   └───────┬───────┘   └───────┬───────┘
//!             ▼                   ▼                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  SessionRegistry (one active session per subscriber)              │
//! │  - Bus (broadcast events)                                         │
//! │  - SubscriberSet (fans out to user subscribers)                   │
//! │  - reaper (removes self-terminated sessions)                      │
//! └──────┬───────────────────────┬────────────────────────────┬──────┘
//!        ▼                       ▼                            │
//!   ┌───────────────┐      ┌───────────────┐                  │
//!   │ StreamSession │      │ StreamSession │                  │
//!   │  TailAdapter  │      │  TailAdapter  │                  │
//!   │  BatchBuffer  │      │  BatchBuffer  │                  │
//!   │  TokenBucket  │      │  TokenBucket  │                  │
//!   └┬──────────────┘      └┬──────────────┘                  │
//!    │ Publishes            │ Publishes                       │
//!    │ Events:              │ Events:                         │
//!    │ - SessionRunning     │ - FlushDelivered                │
//!    │ - FlushCollapsed     │ - SourceRetry                   │
//!    │ - SessionStopped     │ - SourceLost                    │
//!    ▼                      ▼                                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                 (capacity: StreamConfig::bus_capacity)            │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │    fan-out listener    │
//!                       │     (in registry)      │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                          (per-sub queues + workers)
//! ```
//!
//! ### Session lifecycle
//! ```text
//! start(subscriber, destination, source, mode)
//!   ├─► TailAdapter::connect()  ── NotFound? ─► error, no session created
//!   ├─► replace prior session (cancel ─► join, bounded by stop_grace)
//!   └─► spawn worker:
//!
//! Starting ──► Running ──► Stopping ──► Stopped        (no state repeats)
//!
//! loop {                                               (Running)
//!   ├─► adapter.pull()          (cancellable, bounded by poll_interval)
//!   ├─► push lines into BatchBuffer
//!   └─► flush when full or flush_interval elapsed:
//!         TokenBucket::try_consume(1):
//!           ├─ granted ─► chunk under the sink cap ─► send each chunk
//!           └─ denied  ─► keep the trailing window, drop the rest,
//!                         prepend "[rate limited: N older lines dropped]"
//! }
//!
//! exit (stop / source ended / source lost):
//!   ├─► final flush (always full delivery, no token accounting)
//!   ├─► stop notice to the destination
//!   └─► Stopped ─► registry entry removed
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                       |
//! |-------------------|--------------------------------------------------------------------|------------------------------------------|
//! | **Sessions**      | Start, replace, and stop per-subscriber streaming sessions.        | [`SessionRegistry`], [`SessionState`]    |
//! | **Sources**       | Plug in whatever produces log bytes (poll or follow shaped).       | [`LogSource`], [`TailMode`], [`Cursor`]  |
//! | **Sinks**         | Plug in whatever delivers text (chat API, webhook, stdout).        | [`NotificationSink`], [`Destination`]    |
//! | **Backpressure**  | Batch, chunk, rate-limit, and collapse under overload.             | [`BatchBuffer`], [`TokenBucket`]         |
//! | **Subscriber API**| Hook into runtime events (logging, metrics, custom subscribers).   | [`Subscribe`], [`Event`]                 |
//! | **Policies**      | Configure source retry backoff and flush rate limits.              | [`BackoffPolicy`], [`JitterPolicy`]      |
//! | **Errors**        | Typed errors for sources, delivery, and the registry.              | [`SourceError`], [`StreamError`]         |
//! | **Configuration** | Centralize runtime settings.                                       | [`StreamConfig`]                         |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use tailcast::{
//!     Cursor, DeliveryError, Destination, LogSource, LogWriter, NotificationSink,
//!     SessionRegistry, SourceError, SourceRef, StreamConfig, Subscribe,
//!     SubscriberId, TailMode,
//! };
//!
//! // A source that produces one line per poll.
//! struct Ticker;
//!
//! #[async_trait]
//! impl LogSource for Ticker {
//!     async fn tail(&self, source: &SourceRef, _limit: usize) -> Result<Vec<u8>, SourceError> {
//!         Ok(format!("{source} is alive\n").into_bytes())
//!     }
//!
//!     async fn poll_since(
//!         &self,
//!         source: &SourceRef,
//!         _cursor: Cursor,
//!     ) -> Result<(Vec<u8>, Cursor), SourceError> {
//!         Ok((format!("tick from {source}\n").into_bytes(), Cursor::now()))
//!     }
//! }
//!
//! // A sink that prints instead of hitting a chat API.
//! struct Stdout;
//!
//! #[async_trait]
//! impl NotificationSink for Stdout {
//!     async fn send(&self, dest: Destination, text: &str) -> Result<(), DeliveryError> {
//!         println!("[{dest}] {text}");
//!         Ok(())
//!     }
//!
//!     fn max_message_size(&self) -> usize {
//!         4096
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
//!     let registry = SessionRegistry::new(
//!         StreamConfig::default(),
//!         Arc::new(Ticker),
//!         Arc::new(Stdout),
//!         subs,
//!     );
//!
//!     let subscriber = SubscriberId::new(1);
//!     registry
//!         .start(subscriber, Destination::new(42), SourceRef::new("web"), TailMode::Poll)
//!         .await?;
//!
//!     tokio::time::sleep(Duration::from_secs(10)).await;
//!     registry.stop(subscriber).await;
//!     Ok(())
//! }
//! ```

mod buffer;
mod config;
mod error;
mod events;
mod policies;
mod session;
mod sink;
mod source;
mod subscribers;

// ---- Public re-exports ----

pub use buffer::{BatchBuffer, TRUNCATION_MARKER, chunk_message, collapse_tail};
pub use config::StreamConfig;
pub use error::{DeliveryError, SourceError, StreamError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, TokenBucket};
pub use session::{SessionRegistry, SessionState, SubscriberId};
pub use sink::{Destination, NotificationSink};
pub use source::{Cursor, FollowStream, LogSource, Pulled, SourceRef, TailMode};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
