//! The `{ ok, message, <key>: <payload> }` shape every endpoint returns.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Generic fallback when neither the server nor the status says more.
pub const REQUEST_FAILED: &str = "Request failed";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Every other top-level key.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Envelope {
    /// Parse a response body.
    ///
    /// Non-JSON content types and malformed bodies both give an empty
    /// envelope; a parse error never escapes.
    pub fn parse(content_type: Option<&str>, body: &[u8]) -> Self {
        let is_json = content_type.is_some_and(|ct| ct.contains("json"));
        if !is_json {
            return Self::default();
        }
        Self::parse_lenient(body)
    }

    /// Parse as JSON regardless of content type, falling back to empty.
    ///
    /// `ok` is kept only when it is a bool and `message` only when it is a
    /// string; a mistyped field never discards the rest of the object.
    pub fn parse_lenient(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(mut payload)) => {
                let ok = payload.remove("ok").and_then(|v| v.as_bool());
                let message = payload
                    .remove("message")
                    .and_then(|v| v.as_str().map(str::to_string));
                Self {
                    ok,
                    message,
                    payload,
                }
            }
            _ => Self::default(),
        }
    }

    /// An envelope is a success unless the server set `ok: false`.
    pub fn is_explicit_failure(&self) -> bool {
        self.ok == Some(false)
    }

    /// Trimmed server message, if non-empty.
    pub fn server_message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    /// Check transport status and envelope together.
    pub fn into_result(self, status: u16) -> Result<Self, ApiError> {
        let success = (200..300).contains(&status);
        if success && !self.is_explicit_failure() {
            return Ok(self);
        }

        let message = match self.server_message() {
            Some(m) => m.to_string(),
            None if !success => format!("{} ({})", REQUEST_FAILED, status),
            None => REQUEST_FAILED.to_string(),
        };

        Err(ApiError::Server {
            status: (!success).then_some(status),
            message,
        })
    }

    /// Deserialize the payload stored under `key`.
    ///
    /// Missing or `null` keys give `Ok(None)`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ApiError> {
        match self.payload.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|e| ApiError::Decode {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    /// Like `get`, but a missing list is an empty list.
    pub fn list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, ApiError> {
        Ok(self.get::<Vec<T>>(key)?.unwrap_or_default())
    }

    /// Like `get`, but a missing key is an error.
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T, ApiError> {
        self.get(key)?.ok_or_else(|| ApiError::Decode {
            key: key.to_string(),
            message: "missing from response".to_string(),
        })
    }
}
