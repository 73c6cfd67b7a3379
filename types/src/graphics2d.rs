//! Generic 2-D graphics figures: image layers plus groups of vector shapes.
//!
//! Images arrive as a required `image_layers` list drawn bottom to top. The
//! older single optional `image` field is not accepted.

use serde_json::Value;

use crate::decode::{self, Decode, DecodeError, DecodeErrorKind, DecodeResult};
use crate::figure::Point2d;

/// Rows in a 28x28 binary image.
pub const BINARY28_ROWS: usize = 28;

#[derive(Debug, Clone, PartialEq)]
pub struct Graphics2dProps {
    pub image_layers: Vec<ImageLayer>,
    pub shape_groups: Vec<ShapeGroup>,
    pub xrange: (f32, f32),
    pub yrange: (f32, f32),
}

impl Decode for Graphics2dProps {
    fn decode(value: &Value) -> DecodeResult<Self> {
        Ok(Self {
            image_layers: decode::member(value, "image_layers", |layers| {
                decode::array(layers, ImageLayer::decode)
            })?,
            shape_groups: decode::member(value, "shape_groups", |groups| {
                decode::array(groups, ShapeGroup::decode)
            })?,
            xrange: decode::member(value, "xrange", |r| decode::pair(r, decode::float32))?,
            yrange: decode::member(value, "yrange", |r| decode::pair(r, decode::float32))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageLayer {
    /// 28x28 one-bit image, one `u32` bitmask per row.
    Binary28 { rows: [u32; BINARY28_ROWS] },
}

impl Decode for ImageLayer {
    fn decode(value: &Value) -> DecodeResult<Self> {
        match decode::discriminant(value, "kind")? {
            "Binary28" => {
                let rows = decode::member(value, "rows", |rows| {
                    let decoded = decode::array(rows, |row| {
                        let wide = decode::unsigned(row)?;
                        u32::try_from(wide).map_err(|_| {
                            DecodeError::new(DecodeErrorKind::OutOfRange { expected: "u32" })
                        })
                    })?;
                    let found = decoded.len();
                    <[u32; BINARY28_ROWS]>::try_from(decoded).map_err(|_| {
                        DecodeError::new(DecodeErrorKind::WrongLength {
                            expected: BINARY28_ROWS,
                            found,
                        })
                    })
                })?;
                Ok(Self::Binary28 { rows })
            }
            other => Err(
                DecodeError::new(DecodeErrorKind::UnknownDiscriminant(other.to_string()))
                    .in_field("kind"),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeGroup {
    pub line_width: f32,
    pub shapes: Vec<Shape2d>,
}

impl Decode for ShapeGroup {
    fn decode(value: &Value) -> DecodeResult<Self> {
        Ok(Self {
            line_width: decode::member(value, "line_width", decode::float32)?,
            shapes: decode::member(value, "shapes", |shapes| {
                decode::array(shapes, Shape2d::decode)
            })?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape2d {
    Arrow { from: Point2d, to: Point2d },
    Line { start: Point2d, end: Point2d },
    LoopFrame { points: Vec<Point2d> },
}

impl Decode for Shape2d {
    fn decode(value: &Value) -> DecodeResult<Self> {
        match decode::discriminant(value, "kind")? {
            "Arrow" => Ok(Self::Arrow {
                from: decode::member(value, "from", Point2d::decode)?,
                to: decode::member(value, "to", Point2d::decode)?,
            }),
            "Line" => Ok(Self::Line {
                start: decode::member(value, "start", Point2d::decode)?,
                end: decode::member(value, "end", Point2d::decode)?,
            }),
            "LoopFrame" => Ok(Self::LoopFrame {
                points: decode::member(value, "points", |points| {
                    decode::array(points, Point2d::decode)
                })?,
            }),
            other => Err(
                DecodeError::new(DecodeErrorKind::UnknownDiscriminant(other.to_string()))
                    .in_field("kind"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point(x: f32, y: f32) -> Value {
        json!({"x": x, "y": y})
    }

    #[test]
    fn decodes_shapes_and_image() {
        let props = Graphics2dProps::decode(&json!({
            "kind": "Graphics2d",
            "image_layers": [{"kind": "Binary28", "rows": vec![1u32; BINARY28_ROWS]}],
            "shape_groups": [{
                "line_width": 2.0,
                "shapes": [
                    {"kind": "Arrow", "from": point(0.0, 0.0), "to": point(1.0, 1.0)},
                    {"kind": "LoopFrame", "points": [point(0.0, 0.0), point(0.0, 1.0)]}
                ]
            }],
            "xrange": [0.0, 28.0],
            "yrange": [0.0, 28.0]
        }))
        .unwrap();
        assert_eq!(props.image_layers.len(), 1);
        assert_eq!(props.shape_groups[0].shapes.len(), 2);
        assert!(matches!(props.shape_groups[0].shapes[0], Shape2d::Arrow { .. }));
    }

    #[test]
    fn single_image_field_is_rejected() {
        let err = Graphics2dProps::decode(&json!({
            "kind": "Graphics2d",
            "image": {"kind": "Binary28", "rows": vec![0u32; BINARY28_ROWS]},
            "shape_groups": [],
            "xrange": [0.0, 28.0],
            "yrange": [0.0, 28.0]
        }))
        .unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::MissingField);
        assert_eq!(err.path_string(), "$.image_layers");
    }

    #[test]
    fn binary28_requires_28_rows() {
        let err = ImageLayer::decode(&json!({"kind": "Binary28", "rows": [0, 1, 2]})).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::WrongLength {
                expected: 28,
                found: 3
            }
        );
        assert_eq!(err.path_string(), "$.rows");
    }

    #[test]
    fn unknown_shape_kind_fails() {
        let err = Shape2d::decode(&json!({"kind": "Circle", "radius": 1})).unwrap_err();
        assert_eq!(err.path_string(), "$.kind");
    }
}
