//! Session identity and state machine.
//!
//! [`SessionState`] moves strictly forward:
//!
//! ```text
//! Starting ──► Running ──► Stopping ──► Stopped (terminal)
//! ```
//!
//! There is no cycle back to `Running` from `Stopping`. Only the session
//! worker writes the state; the registry and tests observe it through a
//! `tokio::sync::watch` receiver.

use std::fmt;

/// Opaque identity of a requester. At most one active session exists per id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Wraps a raw subscriber id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of one streaming session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Registered; the worker is not yet consuming.
    Starting,
    /// The worker loop is consuming, buffering, and flushing.
    Running,
    /// A stop was requested or the source failed; one final flush remains.
    Stopping,
    /// Terminal. The session is removed from the registry.
    Stopped,
}

impl SessionState {
    /// Returns a short stable label (snake_case) for logs and events.
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
        }
    }

    /// True once the session can never produce output again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Stopped)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
