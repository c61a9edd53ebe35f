use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A successfully parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiPayload {
    /// The server's JSON document, unmodified.
    Json(Value),
    Text(String),
    Binary {
        content_type: Option<String>,
        bytes: Bytes,
    },
    /// Success with nothing usable in the body.
    Empty,
}

impl ApiPayload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiPayload::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ApiPayload::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Deserialize a JSON payload into `T`; other variants decode from `null`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            ApiPayload::Json(v) => T::deserialize(v),
            _ => T::deserialize(&Value::Null),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ApiPayload::Empty)
    }
}
