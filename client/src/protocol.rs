//! Wire messages exchanged with the trace backend.
//!
//! Outgoing [`Request`]s are serialized with serde. Inbound messages are
//! validated against the closed [`Response`] envelope through the strict
//! decoder layer before any field is trusted.

use serde::Serialize;
use serde_json::Value;
use tracer_types::decode::{self, Decode, DecodeError, DecodeErrorKind, DecodeResult};
use tracer_types::{FigureProps, Trace, TraceId};

/// A client request. Fire-and-forget: there is no request id, responses are
/// correlated by kind plus the embedded trace id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Request {
    RootTraces,
    Subtraces { id: TraceId },
    Figure { id: TraceId },
    Activate { id: TraceId },
    ToggleExpansion { id: TraceId },
}

impl Request {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RootTraces => "RootTraces",
            Self::Subtraces { .. } => "Subtraces",
            Self::Figure { .. } => "Figure",
            Self::Activate { .. } => "Activate",
            Self::ToggleExpansion { .. } => "ToggleExpansion",
        }
    }

    /// Serialize to the single-line JSON text sent on the wire.
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A validated backend response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    RootTraces { root_traces: Vec<Trace> },
    Subtraces { id: TraceId, subtraces: Vec<Trace> },
    Figure { id: TraceId, figure: FigureProps },
    DidActivate { id: TraceId },
    DidToggleExpansion { id: TraceId },
}

impl Response {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RootTraces { .. } => "RootTraces",
            Self::Subtraces { .. } => "Subtraces",
            Self::Figure { .. } => "Figure",
            Self::DidActivate { .. } => "DidActivate",
            Self::DidToggleExpansion { .. } => "DidToggleExpansion",
        }
    }
}

fn traces(value: &Value) -> DecodeResult<Vec<Trace>> {
    decode::array(value, Trace::decode)
}

impl Decode for Response {
    fn decode(value: &Value) -> DecodeResult<Self> {
        match decode::discriminant(value, "type")? {
            "RootTraces" => Ok(Self::RootTraces {
                root_traces: decode::member(value, "root_traces", traces)?,
            }),
            "Subtraces" => Ok(Self::Subtraces {
                id: decode::member(value, "id", TraceId::decode)?,
                subtraces: decode::member(value, "subtraces", traces)?,
            }),
            "Figure" => Ok(Self::Figure {
                id: decode::member(value, "id", TraceId::decode)?,
                figure: decode::member(value, "figure", FigureProps::decode)?,
            }),
            "DidActivate" => Ok(Self::DidActivate {
                id: decode::member(value, "id", TraceId::decode)?,
            }),
            "DidToggleExpansion" => Ok(Self::DidToggleExpansion {
                id: decode::member(value, "id", TraceId::decode)?,
            }),
            other => Err(
                DecodeError::new(DecodeErrorKind::UnknownDiscriminant(other.to_string()))
                    .in_field("type"),
            ),
        }
    }
}

/// An inbound message that could not be turned into a [`Response`].
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("message is not valid JSON: {source}")]
    Json {
        payload: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("message does not match the response envelope: {source}")]
    Decode {
        payload: Value,
        #[source]
        source: DecodeError,
    },
}

impl ProtocolError {
    /// The offending payload, for logging.
    #[must_use]
    pub fn payload(&self) -> String {
        match self {
            Self::Json { payload, .. } => payload.clone(),
            Self::Decode { payload, .. } => payload.to_string(),
        }
    }
}

/// Parse and validate one inbound text message.
pub fn decode_response(text: &str) -> Result<Response, ProtocolError> {
    let payload: Value = serde_json::from_str(text).map_err(|source| ProtocolError::Json {
        payload: text.to_string(),
        source,
    })?;
    Response::decode(&payload).map_err(|source| ProtocolError::Decode { payload, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracer_types::PrimitiveValue;

    fn id(raw: u64) -> TraceId {
        TraceId::new(raw)
    }

    #[test]
    fn test_request_serialization() {
        assert_eq!(
            serde_json::to_value(Request::RootTraces).unwrap(),
            json!({"type": "RootTraces"})
        );
        assert_eq!(
            serde_json::to_value(Request::Subtraces { id: id(4) }).unwrap(),
            json!({"type": "Subtraces", "id": 4})
        );
        assert_eq!(
            serde_json::to_value(Request::Figure { id: id(5) }).unwrap(),
            json!({"type": "Figure", "id": 5})
        );
        assert_eq!(
            serde_json::to_value(Request::Activate { id: id(6) }).unwrap(),
            json!({"type": "Activate", "id": 6})
        );
        assert_eq!(
            serde_json::to_value(Request::ToggleExpansion { id: id(7) }).unwrap(),
            json!({"type": "ToggleExpansion", "id": 7})
        );
    }

    #[test]
    fn test_request_text_is_single_line() {
        let text = Request::Activate { id: id(1) }.to_text().unwrap();
        assert!(!text.contains('\n'));
        assert_eq!(text, r#"{"type":"Activate","id":1}"#);
    }

    #[test]
    fn test_decode_root_traces() {
        let response = decode_response(
            r#"{"type":"RootTraces","root_traces":[{"id":1,"parent":null},{"id":2,"parent":null}]}"#,
        )
        .unwrap();
        let Response::RootTraces { root_traces } = response else {
            panic!("expected RootTraces");
        };
        let ids: Vec<TraceId> = root_traces.iter().map(Trace::id).collect();
        assert_eq!(ids, vec![id(1), id(2)]);
    }

    #[test]
    fn test_decode_subtraces() {
        let response = decode_response(
            r#"{"type":"Subtraces","id":1,"subtraces":[{"id":3,"parent":1}]}"#,
        )
        .unwrap();
        assert_eq!(response.kind(), "Subtraces");
        let Response::Subtraces { id: parent, subtraces } = response else {
            panic!("expected Subtraces");
        };
        assert_eq!(parent, id(1));
        assert_eq!(subtraces[0].parent(), Some(id(1)));
    }

    #[test]
    fn test_decode_figure() {
        let response = decode_response(
            r#"{"type":"Figure","id":5,"figure":{"kind":"Primitive","value":{"I32":9}}}"#,
        )
        .unwrap();
        assert_eq!(
            response,
            Response::Figure {
                id: id(5),
                figure: FigureProps::Primitive {
                    value: PrimitiveValue::I32(9)
                }
            }
        );
    }

    #[test]
    fn test_decode_confirmations() {
        assert_eq!(
            decode_response(r#"{"type":"DidActivate","id":2}"#).unwrap(),
            Response::DidActivate { id: id(2) }
        );
        assert_eq!(
            decode_response(r#"{"type":"DidToggleExpansion","id":2}"#).unwrap(),
            Response::DidToggleExpansion { id: id(2) }
        );
    }

    #[test]
    fn test_invalid_json_is_reported_with_payload() {
        let err = decode_response("not json").unwrap_err();
        assert!(matches!(err, ProtocolError::Json { .. }));
        assert_eq!(err.payload(), "not json");
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = decode_response(r#"{"type":"Hello"}"#).unwrap_err();
        let ProtocolError::Decode { source, .. } = err else {
            panic!("expected Decode error");
        };
        assert_eq!(
            source.kind(),
            &DecodeErrorKind::UnknownDiscriminant("Hello".to_string())
        );
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = decode_response(r#"{"type":"Subtraces","id":1}"#).unwrap_err();
        let ProtocolError::Decode { source, .. } = err else {
            panic!("expected Decode error");
        };
        assert_eq!(source.path_string(), "$.subtraces");
    }

    #[test]
    fn test_bad_figure_rejects_whole_message() {
        let err = decode_response(r#"{"type":"Figure","id":5,"figure":{"kind":"Bogus"}}"#)
            .unwrap_err();
        let ProtocolError::Decode { source, .. } = err else {
            panic!("expected Decode error");
        };
        assert_eq!(source.path_string(), "$.figure.kind");
    }
}
