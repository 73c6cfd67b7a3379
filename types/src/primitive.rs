//! Primitive runtime values carried by `Primitive` figures.

use std::fmt;

use serde_json::Value;

use crate::decode::{self, Decode, DecodeError, DecodeErrorKind, DecodeResult};

/// A primitive value, encoded on the wire as a single-key object whose key
/// names the variant: `{"I32": 5}`, `{"Bool": true}`, `{"Void": null}`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimitiveValue {
    I32(i32),
    I64(i64),
    F32(f32),
    B32(u32),
    B64(u64),
    Bool(bool),
    Void,
}

impl PrimitiveValue {
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::I32(_) => "I32",
            Self::I64(_) => "I64",
            Self::F32(_) => "F32",
            Self::B32(_) => "B32",
            Self::B64(_) => "B64",
            Self::Bool(_) => "Bool",
            Self::Void => "Void",
        }
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::B32(v) => write!(f, "{v:#034b}"),
            Self::B64(v) => write!(f, "{v:#066b}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Void => f.write_str("void"),
        }
    }
}

fn narrow<T: TryFrom<W>, W>(wide: W, expected: &'static str) -> DecodeResult<T> {
    T::try_from(wide).map_err(|_| DecodeError::new(DecodeErrorKind::OutOfRange { expected }))
}

impl Decode for PrimitiveValue {
    fn decode(value: &Value) -> DecodeResult<Self> {
        let map = decode::object(value)?;
        let mut entries = map.iter();
        let (tag, payload) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => return Err(DecodeError::new(DecodeErrorKind::MissingDiscriminant)),
        };
        let decoded = match tag.as_str() {
            "I32" => decode::signed(payload).and_then(|v| narrow(v, "i32").map(Self::I32)),
            "I64" => decode::signed(payload).map(Self::I64),
            "F32" => decode::float32(payload).map(Self::F32),
            "B32" => decode::unsigned(payload).and_then(|v| narrow(v, "u32").map(Self::B32)),
            "B64" => decode::unsigned(payload).map(Self::B64),
            "Bool" => decode::boolean(payload).map(Self::Bool),
            "Void" => decode::null(payload).map(|()| Self::Void),
            other => {
                return Err(DecodeError::new(DecodeErrorKind::UnknownDiscriminant(
                    other.to_string(),
                )));
            }
        };
        decoded.map_err(|e| e.in_field(tag))
    }
}
