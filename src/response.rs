use crate::error::{Result, StratumError};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

const JSON_CONTENT_TYPE: &str = "application/json";

/// ErrorResponse holds a structured error returned by the API.
/// Failures at the storage level carry a nested [`BackendError`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Backend (PostgreSQL) error detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendError>,

    /// Top level error message
    #[serde(rename = "error", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// HTTP status line, e.g. "400 Bad Request" (not serialized)
    #[serde(skip)]
    pub status: String,

    /// HTTP status code (not serialized)
    #[serde(skip)]
    pub status_code: u16,
}

/// BackendError holds errors from the API backend (PostgreSQL).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if !self.status.is_empty() {
            parts.push(self.status.clone());
        }
        if let Some(message) = present(&self.message) {
            parts.push(message.to_string());
        }
        if let Some(ref backend) = self.backend {
            let labelled = [
                ("sql", &backend.sql),
                ("message", &backend.message),
                ("code", &backend.code),
                ("severity", &backend.severity),
                ("detail", &backend.detail),
            ];
            for (label, value) in labelled {
                if let Some(value) = present(value) {
                    parts.push(format!("{}: {}", label, value));
                }
            }
        }
        write!(f, "{}", parts.join(": "))
    }
}

/// Reply is the raw JSON body of a successful API call.
///
/// Dropping a reply without calling [`Reply::apply`] discards the body
/// without decoding it.
#[derive(Debug, Clone)]
pub struct Reply {
    status: u16,
    body: Vec<u8>,
}

impl Reply {
    pub(crate) fn new(status: u16, body: Vec<u8>) -> Self {
        Reply { status, body }
    }

    /// HTTP status code of the response (200 or 201)
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Body bytes exactly as returned by the server
    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    /// Take the body bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }

    /// Check if the server sent an empty body
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Apply unmarshals the response body into the provided type
    pub fn apply<T>(&self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(&self.body).map_err(StratumError::from)
    }
}

/// Status line as "<code> <reason>", e.g. "404 Not Found"
pub(crate) fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

/// Compare the media type only, parameters such as charset are ignored
pub(crate) fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE))
        .unwrap_or(false)
}

/// Sort a completed HTTP exchange into success body, API error or
/// transport/protocol error.
pub(crate) fn classify(status: StatusCode, content_type: Option<&str>, body: Vec<u8>) -> Result<Reply> {
    let json = is_json(content_type);

    if !(status == StatusCode::OK || status == StatusCode::CREATED) {
        if json {
            let mut response: ErrorResponse = serde_json::from_slice(&body)?;
            response.status = status_line(status);
            response.status_code = status.as_u16();
            return Err(StratumError::Api(response));
        }
        return Err(StratumError::transport(status_line(status)));
    }

    if !json {
        return Err(StratumError::Protocol {
            content_type: content_type.unwrap_or_default().to_string(),
        });
    }

    Ok(Reply::new(status.as_u16(), body))
}
