//! Observable views over the trace cache.
//!
//! Each projection is a `tokio::sync::watch` channel: subscribers always see
//! the latest committed value and are woken when it changes. Publishing never
//! fails, with or without subscribers. Per-trace streams are created lazily
//! the first time someone asks for them.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracer_types::{FigureProps, Trace, TraceId};

pub type FigureView = Option<Arc<FigureProps>>;
pub type SubtraceView = Option<Vec<Trace>>;

pub struct Projections {
    active: watch::Sender<Option<TraceId>>,
    figure: watch::Sender<FigureView>,
    roots: watch::Sender<Vec<Trace>>,
    visible: watch::Sender<Vec<TraceId>>,
    expansions: HashMap<TraceId, watch::Sender<bool>>,
    subtraces: HashMap<TraceId, watch::Sender<SubtraceView>>,
}

impl Default for Projections {
    fn default() -> Self {
        Self::new()
    }
}

impl Projections {
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: watch::Sender::new(None),
            figure: watch::Sender::new(None),
            roots: watch::Sender::new(Vec::new()),
            visible: watch::Sender::new(Vec::new()),
            expansions: HashMap::new(),
            subtraces: HashMap::new(),
        }
    }

    pub fn active(&self) -> watch::Receiver<Option<TraceId>> {
        self.active.subscribe()
    }

    pub fn figure(&self) -> watch::Receiver<FigureView> {
        self.figure.subscribe()
    }

    pub fn roots(&self) -> watch::Receiver<Vec<Trace>> {
        self.roots.subscribe()
    }

    pub fn visible(&self) -> watch::Receiver<Vec<TraceId>> {
        self.visible.subscribe()
    }

    /// Subscribe to the expansion flag of `id`, seeding a new stream with `current`.
    pub fn expansion(&mut self, id: TraceId, current: bool) -> watch::Receiver<bool> {
        self.expansions
            .entry(id)
            .or_insert_with(|| watch::Sender::new(current))
            .subscribe()
    }

    /// Subscribe to the children of `id`, seeding a new stream with `current`.
    pub fn subtraces(&mut self, id: TraceId, current: SubtraceView) -> watch::Receiver<SubtraceView> {
        self.subtraces
            .entry(id)
            .or_insert_with(|| watch::Sender::new(current))
            .subscribe()
    }

    pub fn publish_active(&self, id: Option<TraceId>) {
        self.active.send_if_modified(|current| replace_if_changed(current, id));
    }

    pub fn publish_figure(&self, figure: FigureView) {
        self.figure.send_replace(figure);
    }

    pub fn publish_roots(&self, roots: Vec<Trace>) {
        self.roots.send_replace(roots);
    }

    pub fn publish_visible(&self, visible: Vec<TraceId>) {
        self.visible
            .send_if_modified(|current| replace_if_changed(current, visible));
    }

    /// Update an existing expansion stream. Streams nobody asked for are not created.
    pub fn publish_expansion(&self, id: TraceId, expanded: bool) {
        if let Some(sender) = self.expansions.get(&id) {
            sender.send_if_modified(|current| replace_if_changed(current, expanded));
        }
    }

    /// Update an existing subtrace stream. Streams nobody asked for are not created.
    pub fn publish_subtraces(&self, id: TraceId, subtraces: Vec<Trace>) {
        if let Some(sender) = self.subtraces.get(&id) {
            sender.send_replace(Some(subtraces));
        }
    }

    /// Drop every sender. Subscribers observe a closed channel.
    pub fn close(self) {
        tracing::debug!(
            expansion_streams = self.expansions.len(),
            subtrace_streams = self.subtraces.len(),
            "Closing projections"
        );
    }
}

fn replace_if_changed<T: PartialEq>(current: &mut T, next: T) -> bool {
    if *current == next {
        false
    } else {
        *current = next;
        true
    }
}
