//! Mutation records shown by `Mutations` figures.

use serde_json::Value;

use crate::decode::{self, Decode, DecodeResult};
use crate::figure::FigureProps;

/// One recorded mutation: the value before (if any) and after.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub name: String,
    pub before: Option<FigureProps>,
    pub after: FigureProps,
    pub idx: u64,
}

impl Decode for MutationRecord {
    fn decode(value: &Value) -> DecodeResult<Self> {
        Ok(Self {
            name: decode::member(value, "name", decode::string)?,
            before: decode::optional_member(value, "before", FigureProps::decode)?,
            after: decode::member(value, "after", FigureProps::decode)?,
            idx: decode::member(value, "idx", decode::unsigned)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::PrimitiveValue;
    use serde_json::json;

    #[test]
    fn before_may_be_absent() {
        let record = MutationRecord::decode(&json!({
            "name": "x",
            "after": {"kind": "Primitive", "value": {"Void": null}},
            "idx": 3
        }))
        .unwrap();
        assert_eq!(record.idx, 3);
        assert!(record.before.is_none());
        assert_eq!(
            record.after,
            FigureProps::Primitive {
                value: PrimitiveValue::Void
            }
        );
    }

    #[test]
    fn after_is_required() {
        let err = MutationRecord::decode(&json!({"name": "x", "before": null, "idx": 0}))
            .unwrap_err();
        assert_eq!(err.path_string(), "$.after");
    }
}
