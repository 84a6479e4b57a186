//! Log source contract and the cancellable tail adapter.
//!
//! ## Contents
//! - [`LogSource`], [`SourceRef`], [`Cursor`] — the external source contract
//! - [`FollowStream`], [`Pulled`] — bounded-wait pull over a live follow
//! - [`TailAdapter`], [`TailMode`], [`TailPull`] — the session-facing pull
//!   interface with retry/backoff and permissive decoding

mod adapter;
mod follow;
mod log_source;

pub use adapter::{TailAdapter, TailMode, TailPull};
pub(crate) use adapter::decode_lines;
pub use follow::{FollowStream, Pulled};
pub use log_source::{Cursor, LogSource, SourceRef};
