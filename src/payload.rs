use crate::error::Result;
use serde::Serialize;
use serde_json::Value;

/// Request body for create, replace and delete calls.
///
/// Raw bytes (or JSON text) are sent verbatim; values are JSON-encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Raw(Vec<u8>),
    Json(Value),
}

impl Payload {
    /// Encode any serializable value
    pub fn json<T>(value: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        Ok(Payload::Json(serde_json::to_value(value)?))
    }

    pub(crate) fn into_body(self) -> Result<Vec<u8>> {
        match self {
            Payload::Raw(bytes) => Ok(bytes),
            Payload::Json(value) => Ok(serde_json::to_vec(&value)?),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Raw(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Raw(bytes.to_vec())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Raw(text.as_bytes().to_vec())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Raw(text.into_bytes())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}
