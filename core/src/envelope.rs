//! Response envelopes used by every admin API endpoint.
//!
//! Success bodies look like `{ success, message, data }`. Collections are
//! sometimes paginated as `data: { users: [...], total, page, totalPages }`
//! and singletons are sometimes nested one level deeper, e.g.
//! `data: { settings: {...} }`. Both nestings are accepted wherever a
//! resource is read, so screens never depend on which variant a given
//! endpoint uses.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// The `{ success, message, data }` wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Body of a non-2xx response.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorEnvelope {
    /// Extract the server's message; `None` when the body is not an error
    /// envelope at all.
    pub fn message_from(body: &[u8]) -> Option<String> {
        let envelope: ErrorEnvelope = serde_json::from_slice(body).ok()?;
        envelope.message.or(envelope.error)
    }
}

/// How a successful body is reduced before it reaches the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unwrap {
    /// `envelope.data`.
    Data,
    /// `envelope.data.<field>`, or `envelope.data` when the member is absent.
    Field(&'static str),
    /// Ignore the body.
    Empty,
}

impl Unwrap {
    pub fn apply(self, body: &[u8]) -> Result<Value, ApiError> {
        if self == Unwrap::Empty {
            return Ok(Value::Null);
        }
        let envelope: Envelope<Value> = serde_json::from_slice(body)?;
        let data = envelope
            .data
            .ok_or_else(|| ApiError::Shape("envelope has no `data` member".to_string()))?;
        match self {
            Unwrap::Field(field) => Ok(nested(data, field)),
            _ => Ok(data),
        }
    }
}

fn nested(data: Value, field: &str) -> Value {
    match data {
        Value::Object(mut map) if map.contains_key(field) => {
            map.remove(field).unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Pull a typed value out of `data`, trying `data.<field>` first and `data`
/// itself second. `None` means neither position holds a `T`.
///
/// Records default most of their fields, so almost any object deserializes
/// into one. `data` only counts as the record when it shares at least one
/// member with it; `{}` or an unrelated object yields `None`.
pub fn pluck<T: DeserializeOwned + Serialize>(data: &Value, field: &str) -> Option<T> {
    if let Some(inner) = data.get(field) {
        if let Ok(value) = serde_json::from_value(inner.clone()) {
            return Some(value);
        }
    }
    let value: T = serde_json::from_value(data.clone()).ok()?;
    shares_member(data, &value).then_some(value)
}

fn shares_member<T: Serialize>(data: &Value, value: &T) -> bool {
    match (data, serde_json::to_value(value)) {
        (Value::Object(raw), Ok(Value::Object(typed))) => raw.keys().any(|name| typed.contains_key(name)),
        (Value::Object(_), _) => false,
        _ => true,
    }
}

/// One page of a server-paginated collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(alias = "users", alias = "transactions", alias = "results")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub total_pages: u32,
}

fn first_page() -> u32 {
    1
}
