//! Transport seam between the session core and an HTTP client.
//!
//! The core only needs "send these bytes, give me status + body back". The
//! default implementation is `reqwest`; hosts can plug in their own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

pub use reqwest::Method;

use crate::error::TransportError;

/// Request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Serialised as JSON with `Content-Type: application/json`.
    Json(Value),
    /// Raw bytes (uploads, multipart). No content type is forced; pass one as
    /// a header if the payload needs it.
    Binary(Vec<u8>),
}

/// A fully resolved request, ready to go on the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl TransportRequest {
    /// Value of the `Authorization` header, if set.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(AUTHORIZATION.as_str()))
            .map(|(_, value)| value.as_str())
    }

    /// Whether a header with this name (case-insensitive) is set.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(header, _)| header.eq_ignore_ascii_case(name))
    }
}

/// Raw response as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// `reqwest`-backed transport with a finite per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client. The caller is responsible for its timeout.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let caller_content_type = request.has_header(CONTENT_TYPE.as_str());
        let mut builder = self.client.request(request.method, &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => {
                let payload = serde_json::to_vec(&value)
                    .map_err(|e| TransportError::Other(format!("failed to encode request: {e}")))?;
                if caller_content_type {
                    builder.body(payload)
                } else {
                    builder.header(CONTENT_TYPE, "application/json").body(payload)
                }
            }
            RequestBody::Binary(bytes) => builder.body(bytes),
        };

        let response = builder.send().await.map_err(map_request_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_request_error)?;

        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn map_request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let request = TransportRequest {
            method: Method::POST,
            url: "http://api/quotes".to_string(),
            headers: vec![
                ("content-type".to_string(), "application/merge-patch+json".to_string()),
                ("AUTHORIZATION".to_string(), "Bearer a1".to_string()),
            ],
            body: RequestBody::Json(Value::Null),
        };
        assert!(request.has_header(CONTENT_TYPE.as_str()));
        assert!(!request.has_header("x-request-id"));
        assert_eq!(request.authorization(), Some("Bearer a1"));
    }
}
