//! Trace cache: everything the client has learned about the backend tree.
//!
//! Each entity kind lives in its own map behind typed accessors, so the
//! "registered before queried" precondition is checked where the value is
//! read. The cache performs no IO; callers that need a fetch are told so by
//! the return value and send the request themselves.

use std::collections::HashMap;
use std::sync::Arc;

use tracer_types::{FigureProps, Trace, TraceId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("trace {0} was never registered")]
    Unregistered(TraceId),
    #[error("no subtrace request is pending for trace {0}")]
    NotPending(TraceId),
}

/// Outcome of registering a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    New,
    /// Already present with identical content.
    Known,
    /// Already present with different content. The cached value is kept.
    Conflict,
}

/// Children of one trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubtraceSlot {
    #[default]
    Unrequested,
    Pending,
    Resolved(Vec<TraceId>),
}

/// Result of reading a subtrace slot through [`TraceCache::request_subtraces`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtraceLookup<'a> {
    /// The slot moved from unrequested to pending; the caller must send the request.
    Requested,
    Pending,
    Resolved(&'a [TraceId]),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum FigureSlot {
    #[default]
    Absent,
    Pending,
    Resolved(Arc<FigureProps>),
}

#[derive(Debug, Default)]
pub struct TraceCache {
    traces: HashMap<TraceId, Trace>,
    expansions: HashMap<TraceId, bool>,
    subtraces: HashMap<TraceId, SubtraceSlot>,
    figures: HashMap<TraceId, FigureSlot>,
    roots: Vec<TraceId>,
}

impl TraceCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trace. Idempotent for identical content; never overwrites.
    pub fn register(&mut self, trace: Trace) -> Registration {
        let id = trace.id();
        match self.traces.get(&id) {
            Some(existing) if *existing == trace => Registration::Known,
            Some(_) => Registration::Conflict,
            None => {
                self.traces.insert(id, trace);
                self.expansions.insert(id, false);
                Registration::New
            }
        }
    }

    #[must_use]
    pub fn trace(&self, id: TraceId) -> Option<&Trace> {
        self.traces.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: TraceId) -> bool {
        self.traces.contains_key(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn set_roots(&mut self, roots: Vec<TraceId>) {
        self.roots = roots;
    }

    #[must_use]
    pub fn roots(&self) -> &[TraceId] {
        &self.roots
    }

    /// Root traces in backend order.
    #[must_use]
    pub fn root_traces(&self) -> Vec<Trace> {
        self.collect_traces(&self.roots)
    }

    fn collect_traces(&self, ids: &[TraceId]) -> Vec<Trace> {
        ids.iter()
            .filter_map(|id| self.traces.get(id))
            .cloned()
            .collect()
    }

    pub fn is_expanded(&self, id: TraceId) -> Result<bool, CacheError> {
        self.expansions
            .get(&id)
            .copied()
            .ok_or(CacheError::Unregistered(id))
    }

    /// Flip the expansion flag and return the new value.
    pub fn toggle_expansion(&mut self, id: TraceId) -> Result<bool, CacheError> {
        let flag = self
            .expansions
            .get_mut(&id)
            .ok_or(CacheError::Unregistered(id))?;
        *flag = !*flag;
        Ok(*flag)
    }

    #[must_use]
    pub fn subtraces(&self, id: TraceId) -> &SubtraceSlot {
        const UNREQUESTED: &SubtraceSlot = &SubtraceSlot::Unrequested;
        self.subtraces.get(&id).unwrap_or(UNREQUESTED)
    }

    /// Read the children of `id`, marking the slot pending on first access.
    ///
    /// At most one request per id is ever signalled.
    pub fn request_subtraces(&mut self, id: TraceId) -> SubtraceLookup<'_> {
        let slot = self.subtraces.entry(id).or_default();
        if *slot == SubtraceSlot::Unrequested {
            *slot = SubtraceSlot::Pending;
            return SubtraceLookup::Requested;
        }
        match slot {
            SubtraceSlot::Resolved(children) => SubtraceLookup::Resolved(children),
            SubtraceSlot::Pending | SubtraceSlot::Unrequested => SubtraceLookup::Pending,
        }
    }

    /// Resolve a pending slot with the ordered child ids.
    pub fn resolve_subtraces(
        &mut self,
        id: TraceId,
        children: Vec<TraceId>,
    ) -> Result<(), CacheError> {
        match self.subtraces.get_mut(&id) {
            Some(slot @ SubtraceSlot::Pending) => {
                *slot = SubtraceSlot::Resolved(children);
                Ok(())
            }
            _ => Err(CacheError::NotPending(id)),
        }
    }

    #[must_use]
    pub fn is_subtrace_pending(&self, id: TraceId) -> bool {
        matches!(self.subtraces(id), SubtraceSlot::Pending)
    }

    /// Resolved children, or `None` while unknown.
    #[must_use]
    pub fn children(&self, id: TraceId) -> Option<&[TraceId]> {
        match self.subtraces(id) {
            SubtraceSlot::Resolved(children) => Some(children),
            SubtraceSlot::Unrequested | SubtraceSlot::Pending => None,
        }
    }

    /// Resolved child traces in backend order.
    #[must_use]
    pub fn child_traces(&self, id: TraceId) -> Option<Vec<Trace>> {
        self.children(id).map(|children| self.collect_traces(children))
    }

    #[must_use]
    pub fn has_children(&self, id: TraceId) -> bool {
        self.children(id).is_some_and(|children| !children.is_empty())
    }

    #[must_use]
    pub fn figure(&self, id: TraceId) -> &FigureSlot {
        const ABSENT: &FigureSlot = &FigureSlot::Absent;
        self.figures.get(&id).unwrap_or(ABSENT)
    }

    /// The figure for `id` if it has arrived.
    #[must_use]
    pub fn resolved_figure(&self, id: TraceId) -> Option<Arc<FigureProps>> {
        match self.figure(id) {
            FigureSlot::Resolved(figure) => Some(Arc::clone(figure)),
            FigureSlot::Absent | FigureSlot::Pending => None,
        }
    }

    /// Mark the figure pending if it was never requested.
    ///
    /// Returns `true` when the caller must send the request.
    pub fn request_figure(&mut self, id: TraceId) -> bool {
        if self.figures.contains_key(&id) {
            return false;
        }
        self.figures.insert(id, FigureSlot::Pending);
        true
    }

    /// Store an arrived figure. Returns `false` if it was never requested.
    pub fn store_figure(&mut self, id: TraceId, figure: FigureProps) -> bool {
        let requested = self.figures.contains_key(&id);
        self.figures
            .insert(id, FigureSlot::Resolved(Arc::new(figure)));
        requested
    }
}
