//! Figures attached to traces.
//!
//! [`FigureProps`] is a closed tagged union discriminated by the `kind` field.
//! Decoding follows the same three steps for every tagged union in the crate:
//!
//! 1. read and validate the string discriminant,
//! 2. extract the variant's required fields with per-field decoders,
//! 3. fail on any discriminant that is not routed, with no fallback variant.

use serde_json::Value;

use crate::decode::{self, Decode, DecodeError, DecodeErrorKind, DecodeResult};
use crate::graphics2d::Graphics2dProps;
use crate::mutation::MutationRecord;
use crate::primitive::PrimitiveValue;

#[derive(Debug, Clone, PartialEq)]
pub enum FigureProps {
    Gallery,
    Graphics2d(Graphics2dProps),
    Plot2d(Plot2dProps),
    Primitive { value: PrimitiveValue },
    Mutations { mutations: Vec<MutationRecord> },
}

impl FigureProps {
    /// Wire discriminant of this variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Gallery => "Gallery",
            Self::Graphics2d(_) => "Graphics2d",
            Self::Plot2d(_) => "Plot2d",
            Self::Primitive { .. } => "Primitive",
            Self::Mutations { .. } => "Mutations",
        }
    }
}

impl Decode for FigureProps {
    fn decode(value: &Value) -> DecodeResult<Self> {
        match decode::discriminant(value, "kind")? {
            "Graphics2d" => Graphics2dProps::decode(value).map(Self::Graphics2d),
            "Plot2d" => Plot2dProps::decode(value).map(Self::Plot2d),
            "Primitive" => Ok(Self::Primitive {
                value: decode::member(value, "value", PrimitiveValue::decode)?,
            }),
            "Mutations" => Ok(Self::Mutations {
                mutations: decode::member(value, "mutations", |mutations| {
                    decode::array(mutations, MutationRecord::decode)
                })?,
            }),
            // Gallery has no client-side decoder yet.
            other => Err(
                DecodeError::new(DecodeErrorKind::UnknownDiscriminant(other.to_string()))
                    .in_field("kind"),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plot2dKind {
    Scatter,
}

impl Decode for Plot2dKind {
    fn decode(value: &Value) -> DecodeResult<Self> {
        match decode::string(value)?.as_str() {
            "Scatter" => Ok(Self::Scatter),
            other => Err(DecodeError::new(DecodeErrorKind::UnknownDiscriminant(
                other.to_string(),
            ))),
        }
    }
}

/// A scatter plot: ordered point groups plus the x/y ranges to display.
#[derive(Debug, Clone, PartialEq)]
pub struct Plot2dProps {
    pub plot_kind: Plot2dKind,
    pub point_groups: Vec<PointGroup>,
    pub xrange: (f32, f32),
    pub yrange: (f32, f32),
}

impl Decode for Plot2dProps {
    fn decode(value: &Value) -> DecodeResult<Self> {
        Ok(Self {
            plot_kind: decode::member(value, "plot_kind", Plot2dKind::decode)?,
            point_groups: decode::member(value, "point_groups", |groups| {
                decode::array(groups, PointGroup::decode)
            })?,
            xrange: decode::member(value, "xrange", |r| decode::pair(r, decode::float32))?,
            yrange: decode::member(value, "yrange", |r| decode::pair(r, decode::float32))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointGroup {
    pub points: Vec<Point2d>,
    pub color: Color,
}

impl Decode for PointGroup {
    fn decode(value: &Value) -> DecodeResult<Self> {
        Ok(Self {
            points: decode::member(value, "points", |points| {
                decode::array(points, Point2d::decode)
            })?,
            color: decode::member(value, "color", Color::decode)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2d {
    pub x: f32,
    pub y: f32,
}

impl Decode for Point2d {
    fn decode(value: &Value) -> DecodeResult<Self> {
        Ok(Self {
            x: decode::member(value, "x", decode::float32)?,
            y: decode::member(value, "y", decode::float32)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Red,
    Yellow,
    Green,
    Blue,
}

impl Color {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }
}

impl Decode for Color {
    fn decode(value: &Value) -> DecodeResult<Self> {
        match decode::string(value)?.as_str() {
            "red" => Ok(Self::Red),
            "yellow" => Ok(Self::Yellow),
            "green" => Ok(Self::Green),
            "blue" => Ok(Self::Blue),
            other => Err(DecodeError::new(DecodeErrorKind::UnknownDiscriminant(
                other.to_string(),
            ))),
        }
    }
}
