//! Trace nodes as delivered by the backend.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::decode::{self, Decode, DecodeResult};

/// Stable identifier of a trace for the lifetime of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(u64);

impl TraceId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Decode for TraceId {
    fn decode(value: &Value) -> DecodeResult<Self> {
        decode::unsigned(value).map(Self)
    }
}

/// One node of the backend-held execution tree.
///
/// Display fields other than `id` and `parent` are opaque to the client and
/// kept verbatim so two deliveries of the same id can be compared.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    id: TraceId,
    parent: Option<TraceId>,
    fields: Map<String, Value>,
}

impl Trace {
    #[must_use]
    pub fn new(id: TraceId, parent: Option<TraceId>, fields: Map<String, Value>) -> Self {
        Self { id, parent, fields }
    }

    #[must_use]
    pub fn id(&self) -> TraceId {
        self.id
    }

    #[must_use]
    pub fn parent(&self) -> Option<TraceId> {
        self.parent
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Opaque display fields supplied by the backend.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl Decode for Trace {
    fn decode(value: &Value) -> DecodeResult<Self> {
        let id = decode::member(value, "id", TraceId::decode)?;
        // `parent` is required on the wire but may be null for roots.
        let parent = decode::member(value, "parent", |parent| match parent {
            Value::Null => Ok(None),
            other => TraceId::decode(other).map(Some),
        })?;
        let fields = decode::object(value)?
            .iter()
            .filter(|(key, _)| key.as_str() != "id" && key.as_str() != "parent")
            .map(|(key, field)| (key.clone(), field.clone()))
            .collect();
        Ok(Self { id, parent, fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DecodeErrorKind;
    use serde_json::json;

    #[test]
    fn decodes_root_and_child() {
        let root = Trace::decode(&json!({"id": 1, "parent": null, "kind": "Main"})).unwrap();
        assert_eq!(root.id(), TraceId::new(1));
        assert!(root.is_root());
        assert_eq!(root.field("kind"), Some(&json!("Main")));
        assert!(root.field("id").is_none());

        let child = Trace::decode(&json!({"id": 3, "parent": 1})).unwrap();
        assert_eq!(child.parent(), Some(TraceId::new(1)));
        assert!(child.fields().is_empty());
    }

    #[test]
    fn parent_field_is_required() {
        let err = Trace::decode(&json!({"id": 1})).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::MissingField);
        assert_eq!(err.path_string(), "$.parent");
    }

    #[test]
    fn id_must_be_a_non_negative_integer() {
        assert!(Trace::decode(&json!({"id": -2, "parent": null})).is_err());
        assert!(Trace::decode(&json!({"id": "2", "parent": null})).is_err());
    }

    #[test]
    fn equality_includes_display_fields() {
        let a = Trace::decode(&json!({"id": 1, "parent": null, "line": 4})).unwrap();
        let b = Trace::decode(&json!({"id": 1, "parent": null, "line": 5})).unwrap();
        assert_ne!(a, b);
    }
}
