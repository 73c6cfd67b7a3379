//! Plain-text rendering of the visible trace tree and the current figure.

use crossterm::{
    cursor::MoveTo,
    execute,
    terminal::{Clear, ClearType},
};
use serde_json::Value;
use std::io::{self, Write};
use tracer_client::{Session, TraceCache};
use tracer_types::{FigureProps, Trace, TraceId};

const HELP: &str = "h/j/k/l or arrows: move   space: expand/collapse   q: quit";

/// Fetch children for every visible trace, then redraw.
pub fn render(session: &mut Session, out: &mut impl Write) -> io::Result<()> {
    let visible = session.visible().borrow().clone();
    for &id in &visible {
        if let Err(e) = session.subtraces(id) {
            tracing::warn!("Could not read subtraces of {id}: {e}");
        }
    }

    let mut lines = tree_lines(session.cache(), &visible, session.active_id());
    lines.push(String::new());
    lines.push(match session.figure().borrow().as_deref() {
        Some(figure) => describe_figure(figure),
        None => "(no figure)".to_string(),
    });
    lines.push(HELP.to_string());

    execute!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    for line in lines {
        // Raw mode: no implicit carriage return.
        write!(out, "{line}\r\n")?;
    }
    out.flush()
}

pub fn tree_lines(cache: &TraceCache, visible: &[TraceId], active: Option<TraceId>) -> Vec<String> {
    visible
        .iter()
        .map(|&id| {
            let cursor = if active == Some(id) { '>' } else { ' ' };
            let marker = if !cache.has_children(id) {
                ' '
            } else if cache.is_expanded(id).unwrap_or(false) {
                '-'
            } else {
                '+'
            };
            let indent = "  ".repeat(depth(cache, id));
            let label = cache.trace(id).map_or_else(|| id.to_string(), trace_label);
            format!("{cursor} {indent}{marker} {label}")
        })
        .collect()
}

fn depth(cache: &TraceCache, id: TraceId) -> usize {
    let mut depth = 0;
    let mut current = cache.trace(id).and_then(Trace::parent);
    while let Some(parent) = current {
        depth += 1;
        current = cache.trace(parent).and_then(Trace::parent);
    }
    depth
}

/// `#id` followed by the scalar display fields in key order.
pub fn trace_label(trace: &Trace) -> String {
    let mut label = format!("#{}", trace.id());
    for (key, value) in trace.fields() {
        let rendered = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => continue,
        };
        label.push_str(&format!(" {key}={rendered}"));
    }
    label
}

pub fn describe_figure(figure: &FigureProps) -> String {
    match figure {
        FigureProps::Primitive { value } => format!("{} {value}", value.tag()),
        FigureProps::Mutations { mutations } => {
            let names: Vec<&str> = mutations.iter().map(|m| m.name.as_str()).collect();
            format!("{} mutation(s): {}", mutations.len(), names.join(", "))
        }
        FigureProps::Plot2d(plot) => {
            let points: usize = plot.point_groups.iter().map(|g| g.points.len()).sum();
            format!(
                "scatter: {} group(s), {points} point(s), x {:?}, y {:?}",
                plot.point_groups.len(),
                plot.xrange,
                plot.yrange
            )
        }
        FigureProps::Graphics2d(graphics) => format!(
            "graphics: {} image layer(s), {} shape group(s)",
            graphics.image_layers.len(),
            graphics.shape_groups.len()
        ),
        FigureProps::Gallery => "gallery".to_string(),
    }
}
