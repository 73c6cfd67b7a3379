//! The per-connection context object.
//!
//! A [`Session`] owns the trace cache, the reactive projections, the active
//! trace id and the sender half of the outgoing request channel. Inbound
//! messages and user commands are applied to it one at a time; nothing here
//! is shared or locked. Dropping or [closing](Session::close) the session
//! tears down the request channel and every projection.

use std::collections::HashSet;

use tokio::sync::{mpsc, watch};
use tracer_types::{Trace, TraceId};

use crate::cache::{CacheError, Registration, SubtraceLookup, TraceCache};
use crate::navigation::{self, Direction};
use crate::projections::{FigureView, Projections, SubtraceView};
use crate::protocol::{self, Request, Response};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("connection to the trace backend is closed")]
    Disconnected,
}

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Validated and applied to the cache.
    Applied,
    /// Failed validation. Logged and discarded.
    Dropped,
    /// Well-formed but contradicts local state. Logged; state may be partial.
    Inconsistent,
}

pub struct Session {
    cache: TraceCache,
    projections: Projections,
    /// Last backend-confirmed activation.
    active: Option<TraceId>,
    /// Trace whose expansion was requested by a right move; descend into it
    /// once the toggle is confirmed.
    pending_descend: Option<TraceId>,
    /// Traces with a `ToggleExpansion` sent but not yet confirmed.
    pending_toggles: HashSet<TraceId>,
    outgoing: mpsc::UnboundedSender<Request>,
}

impl Session {
    pub fn new(outgoing: mpsc::UnboundedSender<Request>) -> Self {
        Self {
            cache: TraceCache::new(),
            projections: Projections::new(),
            active: None,
            pending_descend: None,
            pending_toggles: HashSet::new(),
            outgoing,
        }
    }

    /// Ask the backend for the root list.
    pub fn start(&self) -> Result<(), SessionError> {
        self.send(Request::RootTraces)
    }

    fn send(&self, request: Request) -> Result<(), SessionError> {
        tracing::trace!(kind = request.kind(), "Queueing request");
        self.outgoing
            .send(request)
            .map_err(|_| SessionError::Disconnected)
    }

    #[must_use]
    pub fn cache(&self) -> &TraceCache {
        &self.cache
    }

    #[must_use]
    pub fn active_id(&self) -> Option<TraceId> {
        self.active
    }

    // ---------------------------------------------------------------------
    // Inbound
    // ---------------------------------------------------------------------

    /// Validate one inbound text message and apply it.
    pub fn handle_message(&mut self, text: &str) -> Dispatch {
        match protocol::decode_response(text) {
            Ok(response) => self.handle_response(response),
            Err(err) => {
                tracing::warn!(payload = %err.payload(), "Dropping invalid message: {err}");
                Dispatch::Dropped
            }
        }
    }

    pub fn handle_response(&mut self, response: Response) -> Dispatch {
        tracing::debug!(kind = response.kind(), "Handling response");
        match response {
            Response::RootTraces { root_traces } => self.on_root_traces(root_traces),
            Response::Subtraces { id, subtraces } => self.on_subtraces(id, subtraces),
            Response::Figure { id, figure } => {
                if !self.cache.store_figure(id, figure) {
                    tracing::debug!("Storing figure for trace {id} that was never requested");
                }
                if self.active == Some(id) {
                    self.projections
                        .publish_figure(self.cache.resolved_figure(id));
                }
                Dispatch::Applied
            }
            Response::DidActivate { id } => {
                self.active = Some(id);
                self.projections.publish_active(Some(id));
                self.projections
                    .publish_figure(self.cache.resolved_figure(id));
                Dispatch::Applied
            }
            Response::DidToggleExpansion { id } => self.on_did_toggle_expansion(id),
        }
    }

    /// Returns `false` if the trace conflicts with an already cached one.
    fn register(&mut self, trace: Trace) -> bool {
        let id = trace.id();
        match self.cache.register(trace) {
            Registration::New | Registration::Known => true,
            Registration::Conflict => {
                tracing::warn!("Trace {id} re-delivered with different content; keeping cached value");
                false
            }
        }
    }

    fn register_all(&mut self, traces: Vec<Trace>) -> (Vec<TraceId>, bool) {
        let ids = traces.iter().map(Trace::id).collect();
        let mut consistent = true;
        for trace in traces {
            consistent &= self.register(trace);
        }
        (ids, consistent)
    }

    fn on_root_traces(&mut self, root_traces: Vec<Trace>) -> Dispatch {
        let (ids, consistent) = self.register_all(root_traces);
        self.cache.set_roots(ids);
        self.projections.publish_roots(self.cache.root_traces());
        self.refresh_visible();
        consistency(consistent)
    }

    fn on_subtraces(&mut self, id: TraceId, subtraces: Vec<Trace>) -> Dispatch {
        if !self.cache.is_subtrace_pending(id) {
            tracing::error!(
                "Subtraces response for trace {id} with no pending request; ignoring {} traces",
                subtraces.len()
            );
            return Dispatch::Inconsistent;
        }
        let (children, consistent) = self.register_all(subtraces);
        if let Err(err) = self.cache.resolve_subtraces(id, children) {
            tracing::error!("Failed to resolve subtraces: {err}");
            return Dispatch::Inconsistent;
        }
        if let Some(traces) = self.cache.child_traces(id) {
            self.projections.publish_subtraces(id, traces);
        }
        self.refresh_visible();
        consistency(consistent)
    }

    fn on_did_toggle_expansion(&mut self, id: TraceId) -> Dispatch {
        self.pending_toggles.remove(&id);
        let expanded = match self.cache.toggle_expansion(id) {
            Ok(expanded) => expanded,
            Err(err) => {
                tracing::error!("Toggle confirmation rejected: {err}");
                return Dispatch::Inconsistent;
            }
        };
        self.projections.publish_expansion(id, expanded);
        self.refresh_visible();

        if self.pending_descend == Some(id) {
            self.pending_descend = None;
            if expanded
                && self.active == Some(id)
                && let Err(err) = self.move_down()
            {
                tracing::warn!("Deferred move into trace {id} failed: {err}");
            }
        }
        Dispatch::Applied
    }

    fn refresh_visible(&self) {
        self.projections
            .publish_visible(navigation::visible_traces(&self.cache));
    }

    // ---------------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------------

    /// Send the figure request for `id` unless it was already requested.
    pub fn prefetch_figure(&mut self, id: TraceId) -> Result<(), SessionError> {
        if self.cache.request_figure(id) {
            self.send(Request::Figure { id })?;
        }
        Ok(())
    }

    /// Request activation of `id`. The active id changes on confirmation.
    pub fn activate(&mut self, id: TraceId) -> Result<(), SessionError> {
        if self.active == Some(id) {
            return Ok(());
        }
        self.prefetch_figure(id)?;
        self.send(Request::Activate { id })
    }

    /// Number of known children of `id`, fetching them on first read.
    fn known_child_count(&mut self, id: TraceId) -> Result<Option<usize>, SessionError> {
        let (count, fetch) = match self.cache.request_subtraces(id) {
            SubtraceLookup::Requested => (None, true),
            SubtraceLookup::Pending => (None, false),
            SubtraceLookup::Resolved(children) => (Some(children.len()), false),
        };
        if fetch {
            self.send(Request::Subtraces { id })?;
        }
        Ok(count)
    }

    /// Request an expansion toggle for `id`.
    ///
    /// Returns whether a request was sent: traces without known children and
    /// traces with a toggle still awaiting confirmation are left alone.
    pub fn toggle_expansion(&mut self, id: TraceId) -> Result<bool, SessionError> {
        self.cache.is_expanded(id)?;
        if self.pending_toggles.contains(&id) {
            tracing::trace!("Not toggling trace {id}: previous toggle unconfirmed");
            return Ok(false);
        }
        if self.known_child_count(id)?.unwrap_or(0) == 0 {
            tracing::trace!("Not toggling trace {id}: no known children");
            return Ok(false);
        }
        self.send(Request::ToggleExpansion { id })?;
        self.pending_toggles.insert(id);
        Ok(true)
    }

    /// Expansion state once every in-flight toggle for `id` is confirmed.
    fn will_be_expanded(&self, id: TraceId) -> Result<bool, SessionError> {
        let expanded = self.cache.is_expanded(id)?;
        Ok(expanded != self.pending_toggles.contains(&id))
    }

    pub fn move_in(&mut self, direction: Direction) -> Result<(), SessionError> {
        match direction {
            Direction::Up => self.move_up(),
            Direction::Down => self.move_down(),
            Direction::Left => self.move_left(),
            Direction::Right => self.move_right(),
        }
    }

    fn step(&mut self, direction: Direction) -> Result<(), SessionError> {
        let Some(active) = self.active else {
            return Ok(());
        };
        let visible = navigation::visible_traces(&self.cache);
        match navigation::neighbor(&visible, active, direction) {
            Some(next) => self.activate(next),
            None => Ok(()),
        }
    }

    pub fn move_up(&mut self) -> Result<(), SessionError> {
        self.step(Direction::Up)
    }

    pub fn move_down(&mut self) -> Result<(), SessionError> {
        self.step(Direction::Down)
    }

    /// Expand the active trace and enter its first child once the backend
    /// confirms the expansion.
    pub fn move_right(&mut self) -> Result<(), SessionError> {
        let Some(active) = self.active else {
            return Ok(());
        };
        if self.will_be_expanded(active)? {
            return Ok(());
        }
        if self.toggle_expansion(active)? {
            self.pending_descend = Some(active);
        }
        Ok(())
    }

    /// Collapse the parent of the active trace and activate it.
    pub fn move_left(&mut self) -> Result<(), SessionError> {
        let Some(active) = self.active else {
            return Ok(());
        };
        let trace = self
            .cache
            .trace(active)
            .ok_or(CacheError::Unregistered(active))?;
        let Some(parent) = trace.parent() else {
            return Ok(());
        };
        if self.will_be_expanded(parent)? {
            self.toggle_expansion(parent)?;
        }
        self.activate(parent)
    }

    // ---------------------------------------------------------------------
    // Projections
    // ---------------------------------------------------------------------

    /// Children of `id` as a stream. The first call fetches them.
    pub fn subtraces(&mut self, id: TraceId) -> Result<watch::Receiver<SubtraceView>, SessionError> {
        self.known_child_count(id)?;
        let current = self.cache.child_traces(id);
        Ok(self.projections.subtraces(id, current))
    }

    /// Expansion flag of a registered trace as a stream.
    pub fn expansion(&mut self, id: TraceId) -> Result<watch::Receiver<bool>, SessionError> {
        let current = self.cache.is_expanded(id)?;
        Ok(self.projections.expansion(id, current))
    }

    pub fn root_traces(&self) -> watch::Receiver<Vec<Trace>> {
        self.projections.roots()
    }

    pub fn active_trace(&self) -> watch::Receiver<Option<TraceId>> {
        self.projections.active()
    }

    pub fn figure(&self) -> watch::Receiver<FigureView> {
        self.projections.figure()
    }

    pub fn visible(&self) -> watch::Receiver<Vec<TraceId>> {
        self.projections.visible()
    }

    /// End the session: the request channel closes and every subscriber
    /// observes its projection as closed.
    pub fn close(self) {
        tracing::info!(traces = self.cache.len(), "Closing trace session");
        drop(self.outgoing);
        self.projections.close();
    }
}

fn consistency(consistent: bool) -> Dispatch {
    if consistent {
        Dispatch::Applied
    } else {
        Dispatch::Inconsistent
    }
}
