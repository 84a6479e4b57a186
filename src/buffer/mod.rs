//! Line batching and outbound chunking.
//!
//! ## Contents
//! - [`BatchBuffer`] — accumulates produced lines, decides flush timing
//! - [`chunk_message`] — splits drained text under the sink's size cap
//! - [`collapse_tail`] — lossy trailing window for rate-limited flushes
//! - [`TRUNCATION_MARKER`] — suffix appended to hard-truncated lines

mod batch;
mod chunk;

pub use batch::BatchBuffer;
pub use chunk::{TRUNCATION_MARKER, chunk_message, collapse_tail};
