//! Client-side sync engine for the trace explorer.
//!
//! Keeps a lazily populated view of the backend's trace tree, talks to the
//! backend over a single duplex text channel and drives keyboard navigation
//! over the currently visible part of the tree.

pub mod codec;
pub mod types;

pub(crate) mod cache;
pub(crate) mod connection;
pub(crate) mod navigation;
pub(crate) mod projections;
pub(crate) mod protocol;

mod session;

pub use cache::{CacheError, FigureSlot, Registration, SubtraceSlot, TraceCache};
pub use connection::{Connection, run_session};
pub use navigation::{Direction, visible_traces};
pub use projections::{FigureView, SubtraceView};
pub use protocol::{ProtocolError, Request, Response, decode_response};
pub use session::{Dispatch, Session, SessionError};
pub use types::{CloseReason, Command, ConnectionEvent, SessionEnd};
