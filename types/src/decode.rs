//! Strict decoding of untyped JSON payloads into typed values.
//!
//! Every wire type implements [`Decode`]. Decoders are built from the small
//! combinators in this module and either produce a complete value or fail
//! with a [`DecodeError`] that names the offending path. There is no silent
//! defaulting of required fields and no fallback variant for tagged unions.

use serde_json::{Map, Value};
use thiserror::Error;

pub type DecodeResult<T> = Result<T, DecodeError>;

/// A value that can be decoded from an arbitrary JSON value.
pub trait Decode: Sized {
    fn decode(value: &Value) -> DecodeResult<Self>;
}

/// Decode `value` as `T`.
pub fn decode_value<T: Decode>(value: &Value) -> DecodeResult<T> {
    T::decode(value)
}

/// One step in the path from the payload root to the failing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    #[error("missing required field")]
    MissingField,
    #[error("missing or non-string discriminant")]
    MissingDiscriminant,
    #[error("unrecognized or unimplemented discriminant '{0}'")]
    UnknownDiscriminant(String),
    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("value out of range for {expected}")]
    OutOfRange { expected: &'static str },
    #[error("expected {expected} elements, found {found}")]
    WrongLength { expected: usize, found: usize },
}

/// A decoding failure at a specific path inside the payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at {}: {kind}", self.path_string())]
pub struct DecodeError {
    path: Vec<PathSegment>,
    kind: DecodeErrorKind,
}

impl DecodeError {
    #[must_use]
    pub fn new(kind: DecodeErrorKind) -> Self {
        Self {
            path: Vec::new(),
            kind,
        }
    }

    #[must_use]
    pub fn wrong_type(expected: &'static str, found: &Value) -> Self {
        Self::new(DecodeErrorKind::WrongType {
            expected,
            found: json_type_name(found),
        })
    }

    /// Prefix the path with a field name.
    #[must_use]
    pub fn in_field(mut self, name: &str) -> Self {
        self.path.insert(0, PathSegment::Field(name.to_string()));
        self
    }

    /// Prefix the path with an array index.
    #[must_use]
    pub fn in_index(mut self, index: usize) -> Self {
        self.path.insert(0, PathSegment::Index(index));
        self
    }

    #[must_use]
    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    #[must_use]
    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Render the path as `$.field[0].other`.
    #[must_use]
    pub fn path_string(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.path {
            match segment {
                PathSegment::Field(name) => {
                    out.push('.');
                    out.push_str(name);
                }
                PathSegment::Index(index) => {
                    out.push_str(&format!("[{index}]"));
                }
            }
        }
        out
    }
}

#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn object(value: &Value) -> DecodeResult<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| DecodeError::wrong_type("object", value))
}

/// Decode a required field. `null` counts as present and is handed to `decode`.
pub fn member<T>(
    value: &Value,
    name: &str,
    decode: impl FnOnce(&Value) -> DecodeResult<T>,
) -> DecodeResult<T> {
    let map = object(value)?;
    let field = map
        .get(name)
        .ok_or_else(|| DecodeError::new(DecodeErrorKind::MissingField).in_field(name))?;
    decode(field).map_err(|e| e.in_field(name))
}

/// Decode a field that may be absent or `null`.
pub fn optional_member<T>(
    value: &Value,
    name: &str,
    decode: impl FnOnce(&Value) -> DecodeResult<T>,
) -> DecodeResult<Option<T>> {
    let map = object(value)?;
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(field) => decode(field).map(Some).map_err(|e| e.in_field(name)),
    }
}

/// Read the string discriminant stored under `name`.
pub fn discriminant<'a>(value: &'a Value, name: &str) -> DecodeResult<&'a str> {
    let map = object(value)?;
    map.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| DecodeError::new(DecodeErrorKind::MissingDiscriminant).in_field(name))
}

pub fn string(value: &Value) -> DecodeResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DecodeError::wrong_type("string", value))
}

pub fn boolean(value: &Value) -> DecodeResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| DecodeError::wrong_type("boolean", value))
}

pub fn number(value: &Value) -> DecodeResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| DecodeError::wrong_type("number", value))
}

/// A finite number narrowed to `f32`.
pub fn float32(value: &Value) -> DecodeResult<f32> {
    let wide = number(value)?;
    let narrow = wide as f32;
    if narrow.is_finite() {
        Ok(narrow)
    } else {
        Err(DecodeError::new(DecodeErrorKind::OutOfRange { expected: "f32" }))
    }
}

pub fn unsigned(value: &Value) -> DecodeResult<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or(DecodeError::new(DecodeErrorKind::OutOfRange { expected: "u64" })),
        other => Err(DecodeError::wrong_type("unsigned integer", other)),
    }
}

pub fn signed(value: &Value) -> DecodeResult<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or(DecodeError::new(DecodeErrorKind::OutOfRange { expected: "i64" })),
        other => Err(DecodeError::wrong_type("integer", other)),
    }
}

pub fn null(value: &Value) -> DecodeResult<()> {
    if value.is_null() {
        Ok(())
    } else {
        Err(DecodeError::wrong_type("null", value))
    }
}

/// Decode every element of an array, in order.
pub fn array<T>(value: &Value, decode: impl Fn(&Value) -> DecodeResult<T>) -> DecodeResult<Vec<T>> {
    let items = value
        .as_array()
        .ok_or_else(|| DecodeError::wrong_type("array", value))?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| decode(item).map_err(|e| e.in_index(index)))
        .collect()
}

/// Decode a two-element array such as `[min, max]`.
pub fn pair<T>(value: &Value, decode: impl Fn(&Value) -> DecodeResult<T>) -> DecodeResult<(T, T)> {
    let items = value
        .as_array()
        .ok_or_else(|| DecodeError::wrong_type("array", value))?;
    match items.as_slice() {
        [first, second] => Ok((
            decode(first).map_err(|e| e.in_index(0))?,
            decode(second).map_err(|e| e.in_index(1))?,
        )),
        other => Err(DecodeError::new(DecodeErrorKind::WrongLength {
            expected: 2,
            found: other.len(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn member_reports_missing_field_path() {
        let err = member(&json!({"a": 1}), "b", number).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::MissingField);
        assert_eq!(err.path_string(), "$.b");
    }

    #[test]
    fn nested_errors_accumulate_path() {
        let value = json!({"groups": [{"xs": [1, 2]}, {"xs": [3, "four"]}]});
        let err = member(&value, "groups", |groups| {
            array(groups, |group| member(group, "xs", |xs| array(xs, number)))
        })
        .unwrap_err();
        assert_eq!(err.path_string(), "$.groups[1].xs[1]");
        assert_eq!(
            err.to_string(),
            "at $.groups[1].xs[1]: expected number, found string"
        );
    }

    #[test]
    fn root_errors_display_as_error_trait_objects() {
        let err: Box<dyn std::error::Error> = Box::new(boolean(&json!(1)).unwrap_err());
        assert_eq!(err.to_string(), "at $: expected boolean, found number");
    }

    #[test]
    fn optional_member_treats_null_as_absent() {
        let value = json!({"parent": null});
        assert_eq!(optional_member(&value, "parent", unsigned).unwrap(), None);
        assert_eq!(optional_member(&value, "missing", unsigned).unwrap(), None);
        assert_eq!(
            optional_member(&json!({"parent": 4}), "parent", unsigned).unwrap(),
            Some(4)
        );
    }

    #[test]
    fn discriminant_must_be_string() {
        let err = discriminant(&json!({"kind": 3}), "kind").unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::MissingDiscriminant);
        let err = discriminant(&json!({}), "kind").unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::MissingDiscriminant);
        assert_eq!(discriminant(&json!({"kind": "Plot2d"}), "kind").unwrap(), "Plot2d");
    }

    #[test]
    fn pair_requires_exactly_two_elements() {
        assert_eq!(pair(&json!([0.0, 28.0]), number).unwrap(), (0.0, 28.0));
        let err = pair(&json!([1, 2, 3]), number).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::WrongLength {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn unsigned_rejects_negative_and_fractional() {
        assert!(matches!(
            unsigned(&json!(-1)).unwrap_err().kind(),
            DecodeErrorKind::OutOfRange { .. }
        ));
        assert!(unsigned(&json!(1.5)).is_err());
        assert!(matches!(
            unsigned(&json!("7")).unwrap_err().kind(),
            DecodeErrorKind::WrongType { .. }
        ));
    }

    #[test]
    fn float32_rejects_overflow() {
        assert!(float32(&json!(1e300)).is_err());
        assert_eq!(float32(&json!(2.5)).unwrap(), 2.5);
    }
}
