//! wszero wire protocol.
//!
//! Every inbound frame is a JSON object carrying an `op` tag. Parameters come
//! either nested under `params` or flattened next to `op`; the wszero server
//! emits the flat form (`{"op": "eval_js", "script": "..."}`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DecodeError, DispatchError};

pub const EVAL_JS: &str = "eval_js";
pub const ERROR: &str = "error";

/// A decoded inbound frame, before it is matched against the known operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub op: String,
    pub params: Value,
}

impl Message {
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let Value::Object(mut fields) = serde_json::from_str::<Value>(text)? else {
            return Err(DecodeError::NotAnObject);
        };

        let op = match fields.remove("op") {
            Some(Value::String(op)) => op,
            _ => return Err(DecodeError::MissingOp),
        };

        let params = match fields.remove("params") {
            Some(Value::Object(params)) => Value::Object(params),
            Some(other) => {
                fields.insert("params".to_string(), other);
                Value::Object(fields)
            }
            None => Value::Object(fields),
        };

        Ok(Self { op, params })
    }
}

/// Every operation the client knows how to handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Run `script` in the page's JS context.
    ///
    /// This is remote code execution by construction: whoever controls the
    /// server controls the page. Only connect to servers on a trusted network.
    EvalJs { script: String },
    /// Write `msg` to the page console at error severity.
    Error { msg: String },
}

#[derive(Deserialize)]
struct EvalJsParams {
    script: String,
}

#[derive(Deserialize)]
struct ErrorParams {
    msg: String,
}

impl Operation {
    pub fn from_message(message: Message) -> Result<Self, DispatchError> {
        let Message { op, params } = message;
        let parsed = match op.as_str() {
            EVAL_JS => serde_json::from_value(params)
                .map(|EvalJsParams { script }| Operation::EvalJs { script }),
            ERROR => serde_json::from_value(params).map(|ErrorParams { msg }| Operation::Error { msg }),
            _ => return Err(DispatchError::NoHandler(op)),
        };
        parsed.map_err(|source| DispatchError::InvalidParams { op, source })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::EvalJs { .. } => EVAL_JS,
            Operation::Error { .. } => ERROR,
        }
    }
}

/// Encode an outbound message as the body of a single text frame.
pub fn encode<T: Serialize + ?Sized>(msg: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_nested_params() {
        let message = Message::decode(r#"{"op":"error","params":{"msg":"X"}}"#).unwrap();
        assert_eq!(message.op, "error");
        assert_eq!(message.params, json!({"msg": "X"}));
    }

    #[test]
    fn decodes_flat_params() {
        let message = Message::decode(r#"{"script":"1+1","op":"eval_js"}"#).unwrap();
        assert_eq!(message.op, "eval_js");
        assert_eq!(message.params, json!({"script": "1+1"}));
    }

    #[test]
    fn non_object_params_stay_a_field() {
        let message = Message::decode(r#"{"op":"x","params":3,"y":true}"#).unwrap();
        assert_eq!(message.params, json!({"params": 3, "y": true}));
    }

    #[test]
    fn rejects_bad_frames() {
        assert!(matches!(Message::decode("{nope"), Err(DecodeError::Json(_))));
        assert!(matches!(Message::decode("[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(Message::decode(r#"{"params":{}}"#), Err(DecodeError::MissingOp)));
        assert!(matches!(Message::decode(r#"{"op":7}"#), Err(DecodeError::MissingOp)));
    }

    #[test]
    fn maps_known_operations() {
        let message = Message::decode(r#"{"op":"eval_js","params":{"script":"globalThis.__t=42"}}"#).unwrap();
        assert_eq!(
            Operation::from_message(message).unwrap(),
            Operation::EvalJs {
                script: "globalThis.__t=42".to_string()
            }
        );

        let message = Message::decode(r#"{"op":"error","msg":"boom"}"#).unwrap();
        let op = Operation::from_message(message).unwrap();
        assert_eq!(op.name(), "error");
        assert_eq!(op, Operation::Error { msg: "boom".to_string() });
    }

    #[test]
    fn unknown_operation_has_no_handler() {
        let message = Message::decode(r#"{"op":"chatmsg","params":{"text":"hi"}}"#).unwrap();
        let err = Operation::from_message(message).unwrap_err();
        assert!(matches!(err, DispatchError::NoHandler(ref op) if op == "chatmsg"));
        assert_eq!(err.to_string(), "no handler for chatmsg");
    }

    #[test]
    fn wrong_params_are_reported() {
        let message = Message::decode(r#"{"op":"eval_js","params":{"script":5}}"#).unwrap();
        assert!(matches!(
            Operation::from_message(message),
            Err(DispatchError::InvalidParams { ref op, .. }) if op == "eval_js"
        ));
    }

    #[test]
    fn encodes_compact_json() {
        assert_eq!(encode(&json!({"a": 1})).unwrap(), r#"{"a":1}"#);
    }
}
