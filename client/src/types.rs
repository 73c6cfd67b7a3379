//! Public types shared between the connection tasks and the host.
//!
//! The host forwards user input as [`Command`]s and observes the transport
//! through [`ConnectionEvent`]s.

use std::fmt;

use tracer_types::TraceId;

use crate::navigation::Direction;

/// A user command applied to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    /// Toggle expansion of the active trace.
    ToggleActive,
    ToggleExpansion(TraceId),
    Activate(TraceId),
    Quit,
}

/// Something observed on the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// One inbound text message, not yet validated.
    Message(String),
    Closed(CloseReason),
}

/// Why the transport stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The backend closed the channel.
    Remote,
    /// Reading or writing failed.
    Failed(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remote => f.write_str("closed by backend"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// How a session run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user quit or every command sender was dropped.
    Quit,
    Disconnected(CloseReason),
}
