//! Visible-list derivation and keyboard directions.
//!
//! The visible list is the pre-order flattening of the root list where a
//! node's children are included only if its expansion flag is set and its
//! subtraces are resolved. It is a pure function of the cache; the move
//! commands that act on it live on [`crate::Session`].

use tracer_types::TraceId;

use crate::cache::TraceCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Vim-style bindings: `h` left, `j` down, `k` up, `l` right.
    #[must_use]
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            'h' => Some(Self::Left),
            'j' => Some(Self::Down),
            'k' => Some(Self::Up),
            'l' => Some(Self::Right),
            _ => None,
        }
    }
}

/// Flatten the currently visible part of the tree.
#[must_use]
pub fn visible_traces(cache: &TraceCache) -> Vec<TraceId> {
    let mut visible = Vec::new();
    // Reversed so the first root is popped first.
    let mut stack: Vec<TraceId> = cache.roots().iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        visible.push(id);
        if cache.is_expanded(id).unwrap_or(false)
            && let Some(children) = cache.children(id)
        {
            stack.extend(children.iter().rev().copied());
        }
    }
    visible
}

/// The neighbour of `id` one step up or down the visible list.
#[must_use]
pub fn neighbor(visible: &[TraceId], id: TraceId, direction: Direction) -> Option<TraceId> {
    let position = visible.iter().position(|&v| v == id)?;
    match direction {
        Direction::Up => position.checked_sub(1).map(|p| visible[p]),
        Direction::Down => visible.get(position + 1).copied(),
        Direction::Left | Direction::Right => None,
    }
}
