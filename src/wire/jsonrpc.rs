//! JSON-RPC 2.0 envelope.
//!
//! The wire carries no explicit "this is a request" tag; classification is
//! derived from which fields are present (an id with a method is a request,
//! a method with no id is a notification, no method with a result/error is
//! a response). `JsonRpcMessage` models that derivation directly so callers
//! never need to inspect raw fields themselves.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::ProtocolError;

/// Client-local request id: a monotonic positive integer starting at 1.
/// Echoed back by the server in responses, so the wire representation must
/// also accept a string (some servers round-trip ids as strings).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(u64),
    String(String),
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        RequestId::Number(n)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A classified JSON-RPC 2.0 message. Exactly one of request/notification/
/// response holds for any wire payload; there is no fourth shape.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcMessage {
    Request {
        id: RequestId,
        method: String,
        params: Option<Value>,
    },
    Notification {
        method: String,
        params: Option<Value>,
    },
    Response {
        id: RequestId,
        result: Option<Value>,
        error: Option<JsonRpcErrorObject>,
    },
}

impl JsonRpcMessage {
    pub fn request(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        JsonRpcMessage::Request { id, method: method.into(), params }
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        JsonRpcMessage::Notification { method: method.into(), params }
    }

    /// Parse a single line/chunk of wire JSON into a classified message.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[derive(Serialize, Deserialize)]
struct RawEnvelope {
    jsonrpc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcErrorObject>,
}

impl Serialize for JsonRpcMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let raw = match self {
            JsonRpcMessage::Request { id, method, params } => RawEnvelope {
                jsonrpc: Some("2.0".to_string()),
                id: Some(id.clone()),
                method: Some(method.clone()),
                params: params.clone(),
                result: None,
                error: None,
            },
            JsonRpcMessage::Notification { method, params } => RawEnvelope {
                jsonrpc: Some("2.0".to_string()),
                id: None,
                method: Some(method.clone()),
                params: params.clone(),
                result: None,
                error: None,
            },
            JsonRpcMessage::Response { id, result, error } => RawEnvelope {
                jsonrpc: Some("2.0".to_string()),
                id: Some(id.clone()),
                method: None,
                params: None,
                result: result.clone(),
                error: error.clone(),
            },
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for JsonRpcMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawEnvelope::deserialize(deserializer)?;
        match (raw.id, raw.method, raw.result, raw.error) {
            (Some(id), Some(method), _, _) => Ok(JsonRpcMessage::Request { id, method, params: raw.params }),
            (None, Some(method), _, _) => Ok(JsonRpcMessage::Notification { method, params: raw.params }),
            (Some(id), None, result, error) => Ok(JsonRpcMessage::Response { id, result, error }),
            (None, None, _, _) => Err(D::Error::custom("envelope has neither method nor id/result/error")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_request() {
        let raw = json!({"jsonrpc":"2.0","id":1,"method":"tools/list","params":{}});
        let msg: JsonRpcMessage = serde_json::from_value(raw).unwrap();
        assert!(matches!(msg, JsonRpcMessage::Request { method, .. } if method == "tools/list"));
    }

    #[test]
    fn classifies_notification() {
        let raw = json!({"jsonrpc":"2.0","method":"notifications/initialized"});
        let msg: JsonRpcMessage = serde_json::from_value(raw).unwrap();
        assert!(matches!(msg, JsonRpcMessage::Notification { method, .. } if method == "notifications/initialized"));
    }

    #[test]
    fn classifies_response_with_result() {
        let raw = json!({"jsonrpc":"2.0","id":2,"result":{"tools":[]}});
        let msg: JsonRpcMessage = serde_json::from_value(raw).unwrap();
        assert!(matches!(msg, JsonRpcMessage::Response { result: Some(_), .. }));
    }

    #[test]
    fn classifies_response_with_error() {
        let raw = json!({"jsonrpc":"2.0","id":2,"error":{"code":-32602,"message":"bad"}});
        let msg: JsonRpcMessage = serde_json::from_value(raw).unwrap();
        match msg {
            JsonRpcMessage::Response { error: Some(e), .. } => {
                assert_eq!(e.code, -32602);
                assert_eq!(e.message, "bad");
            }
            _ => panic!("expected response with error"),
        }
    }

    #[test]
    fn round_trips_request() {
        let msg = JsonRpcMessage::request(RequestId::Number(7), "tools/call", Some(json!({"name":"x"})));
        let encoded = serde_json::to_value(&msg).unwrap();
        let decoded: JsonRpcMessage = serde_json::from_value(encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn rejects_malformed_envelope() {
        let raw = json!({"jsonrpc":"2.0"});
        let err = serde_json::from_value::<JsonRpcMessage>(raw).unwrap_err();
        assert!(err.to_string().contains("neither method nor"));
    }
}
