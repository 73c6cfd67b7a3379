//! Domain types for the trace explorer client.
//!
//! This crate contains pure domain types and the strict decoders that turn
//! untyped backend payloads into them. No IO, no async.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

pub mod decode;
mod figure;
mod graphics2d;
mod mutation;
mod primitive;
mod trace;

pub use decode::{Decode, DecodeError, DecodeErrorKind, DecodeResult, decode_value};
pub use figure::{Color, FigureProps, Plot2dKind, Plot2dProps, Point2d, PointGroup};
pub use graphics2d::{BINARY28_ROWS, Graphics2dProps, ImageLayer, Shape2d, ShapeGroup};
pub use mutation::MutationRecord;
pub use primitive::PrimitiveValue;
pub use trace::{Trace, TraceId};
