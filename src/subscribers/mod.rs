//! Event subscribers for the streaming runtime.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   workers/registry ── publish(Event) ──► Bus ──► registry fan-out listener
//!                                                        │
//!                                                  SubscriberSet
//!                                              ┌─────────┼─────────┐
//!                                              ▼         ▼         ▼
//!                                         [queue S1] [queue S2] [queue SN]
//!                                              │         │         │
//!                                         worker S1 worker S2 worker SN
//!                                              ▼         ▼         ▼
//!                                       sub.on_event() per subscriber
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use async_trait::async_trait;
//! use tailcast::{Event, EventKind, Subscribe};
//!
//! struct FlushCounter;
//!
//! #[async_trait]
//! impl Subscribe for FlushCounter {
//!     fn name(&self) -> &'static str { "flush-counter" }
//!
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::FlushDelivered {
//!             // increment a counter
//!         }
//!     }
//! }
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
