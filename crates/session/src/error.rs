//! Error taxonomy for the session core.
//!
//! Callers branch on these types: `SessionExpired` means "log in again",
//! `Transport` means "offer a retry", `Api` carries the server's verdict.

use serde_json::Value;
use thiserror::Error;

/// Maximum number of body characters kept in an error message.
pub const MAX_ERROR_CHARS: usize = 200;

/// The server could not be reached (or did not answer in time).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("unable to reach the server: {0}")]
    Connect(String),
    #[error("transport failure: {0}")]
    Other(String),
}

/// A non-2xx answer from the server.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("request failed ({status}): {message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    /// Parsed body, when the server sent one.
    pub payload: Option<Value>,
}

impl ApiError {
    /// Build from a status and the (tolerantly) parsed body.
    pub fn from_body(status: u16, payload: Option<Value>, raw: &str) -> Self {
        let message = payload
            .as_ref()
            .and_then(message_field)
            .unwrap_or_else(|| sanitize_body(raw));
        Self {
            status,
            message,
            payload,
        }
    }

    /// Build from a status and a raw body that may or may not be JSON.
    pub fn from_raw(status: u16, body: &[u8]) -> Self {
        let raw = String::from_utf8_lossy(body);
        let trimmed = raw.trim();
        let payload = if trimmed.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(trimmed)
                    .unwrap_or_else(|_| Value::String(trimmed.to_string())),
            )
        };
        Self::from_body(status, payload, &raw)
    }
}

fn message_field(payload: &Value) -> Option<String> {
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| payload.get(key).and_then(Value::as_str))
        .map(|m| m.trim().chars().take(MAX_ERROR_CHARS).collect())
}

/// Trim and truncate a raw body for display.
pub fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

/// Credential persistence failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("credential store io error: {0}")]
    Io(String),
    #[error("credential store encoding error: {0}")]
    Serialize(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialize(err.to_string())
    }
}

/// Login failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// Identifier/secret rejected. Never retried automatically.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("login response was malformed: {0}")]
    Malformed(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Refresh failure. Every variant is terminal for the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("refresh failed: no refresh token stored")]
    MissingRefreshToken,
    #[error("refresh failed: server rejected the refresh token ({status})")]
    Rejected { status: u16 },
    #[error("refresh failed: malformed response: {0}")]
    Malformed(String),
    #[error("refresh failed: timed out")]
    Timeout,
    #[error("refresh failed: {0}")]
    Transport(TransportError),
    #[error("refresh failed: could not persist new credentials: {0}")]
    Store(StoreError),
    #[error("refresh failed: refresh task aborted")]
    Aborted,
    /// A login or logout happened while the refresh was in flight.
    #[error("refresh discarded: session changed while refreshing")]
    Superseded,
}

/// Error surfaced by the request dispatcher.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClientError {
    /// The session could not be renewed; the host should re-authenticate.
    #[error("session expired")]
    SessionExpired,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("failed to encode request: {0}")]
    Encode(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api(err) => Some(err.status),
            ClientError::SessionExpired => Some(401),
            _ => None,
        }
    }

    /// Whether retrying the same call later could succeed without re-login.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
