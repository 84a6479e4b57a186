//! Runtime events: types and broadcast bus.
//!
//! Groups the event **data model** and the **bus** used to publish and
//! observe events emitted by session workers, the tail adapter, and the
//! session registry.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] — event classification and payload metadata
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `SessionRegistry`, `StreamSession` workers, `TailAdapter`.
//! - **Consumers**: the registry's fan-out listener (feeds `SubscriberSet`)
//!   and the registry's reaper (cleans up self-terminated sessions).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
