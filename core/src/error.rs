//! Error types for the backoffice API client.
//!
//! # Design
//! Three failure families reach callers: the transport could not complete
//! the round-trip, the server answered with a non-2xx status (usually with a
//! `{message}` error envelope), or the response did not have the expected
//! shape. `NotFound` keeps its own variant because screens routinely treat a
//! missing record differently from a server failure.
//!
//! `ApiError` is `Clone` because a single coalesced fetch hands the same
//! outcome to every waiting reader.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server returned 404, with the error envelope's message if any.
    #[error("resource not found: {}", message.as_deref().unwrap_or("no message"))]
    NotFound { message: Option<String> },

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("no message"))]
    Server {
        status: u16,
        message: Option<String>,
    },

    /// The envelope was valid JSON but a required member was missing.
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A previous call on the same mutation, or an optimistic write to the
    /// same key, has not settled yet.
    #[error("a previous submission is still pending")]
    MutationPending,

    /// `fetch` was called on a query whose `enabled` flag is off.
    #[error("query is disabled")]
    QueryDisabled,

    /// The session file could not be written.
    #[error("session storage failed: {0}")]
    Session(String),
}

impl ApiError {
    /// The message a screen should show: the server's own `message` when the
    /// error envelope carried one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Server {
                message: Some(message),
                ..
            }
            | ApiError::NotFound {
                message: Some(message),
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound { .. } => Some(404),
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure happened before any response arrived.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Deserialization(err.to_string())
    }
}
