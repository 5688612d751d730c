//! Request dispatcher: every outbound API call goes through [`ApiClient::send`].
//!
//! ```text
//! request
//!   ↓
//! 1. attach bearer from the credential store (re-read on every attempt)
//!   ↓
//! 2. send through the transport
//!   ↓
//! 3. 401 (not the refresh endpoint) → SessionManager::refresh → retry once
//!   ↓
//! 4. 204 → Empty; 2xx → parsed body; otherwise ApiError
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ClientError};
use crate::session::SessionManager;
use crate::transport::{Method, RequestBody, TransportRequest, TransportResponse};

const AUTHORIZATION: &str = "Authorization";

/// A request against the API, relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Raw payload (file upload, multipart). The content type is left to the
    /// caller/transport.
    pub fn binary(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body = RequestBody::Binary(bytes.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Successful response body, parsed tolerantly.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// 204, or an empty 2xx body.
    Empty,
    Json(Value),
    /// A body that was not valid JSON.
    Text(String),
}

impl ApiResponse {
    /// Never fails: empty → `Empty`, JSON → `Json`, anything else → `Text`.
    pub fn parse(body: &[u8]) -> Self {
        let raw = String::from_utf8_lossy(body);
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ApiResponse::Empty;
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => ApiResponse::Json(value),
            Err(_) => ApiResponse::Text(raw.into_owned()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ApiResponse::Empty)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ApiResponse::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Decode into a typed value. `Empty` decodes as JSON `null`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        let value = match self {
            ApiResponse::Empty => Value::Null,
            ApiResponse::Json(value) => value,
            ApiResponse::Text(text) => Value::String(text),
        };
        serde_json::from_value(value).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Authenticated API client. Cheap to clone; clones share one session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    session: SessionManager,
}

impl ApiClient {
    pub fn new(session: SessionManager) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Send a request, refreshing and retrying once on 401.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        tracing::debug!(method = %request.method, path = %request.path, "dispatching request");

        let (response, sent_with) = self.execute(&request).await?;

        if response.status != 401 || self.session.config().is_refresh_path(&request.path) {
            return finish(response);
        }

        // Another caller may have refreshed while this request was in flight.
        let current = self.session.current()?.map(|c| c.access_token);
        let already_refreshed = current.is_some() && current != sent_with;

        if !already_refreshed {
            tracing::debug!(path = %request.path, "request unauthorized; refreshing session");
            if let Err(err) = self.session.refresh().await {
                tracing::debug!(error = %err, "refresh failed; surfacing session expiry");
                return Err(ClientError::SessionExpired);
            }
        }

        let (retried, _) = self.execute(&request).await?;
        if retried.status == 401 {
            self.session
                .expire("request still unauthorized after refreshing credentials");
            return Err(ClientError::SessionExpired);
        }

        finish(retried)
    }

    /// Send and decode the body into `T`.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ClientError> {
        self.send(request).await?.into_typed()
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, ClientError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send_json(ApiRequest::get(path)).await
    }

    pub async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ClientError> {
        self.send(ApiRequest::post(path).json(encode(body)?)).await
    }

    pub async fn put_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ClientError> {
        self.send(ApiRequest::put(path).json(encode(body)?)).await
    }

    pub async fn patch_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse, ClientError> {
        self.send(ApiRequest::patch(path).json(encode(body)?)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, ClientError> {
        self.send(ApiRequest::delete(path)).await
    }

    /// One attempt, with whatever credentials are stored right now.
    ///
    /// Returns the response and the access token it was sent with.
    async fn execute(
        &self,
        request: &ApiRequest,
    ) -> Result<(TransportResponse, Option<String>), ClientError> {
        let credentials = self.session.current()?;

        let mut headers = request.headers.clone();
        let sent_with = credentials.map(|credentials| {
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case(AUTHORIZATION));
            headers.push((AUTHORIZATION.to_string(), credentials.bearer()));
            credentials.access_token
        });

        let transport_request = TransportRequest {
            method: request.method.clone(),
            url: self.session.config().url(&request.path),
            headers,
            body: request.body.clone(),
        };

        let response = self.session.transport().execute(transport_request).await?;
        Ok((response, sent_with))
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Value, ClientError> {
    serde_json::to_value(body).map_err(|e| ClientError::Encode(e.to_string()))
}

fn finish(response: TransportResponse) -> Result<ApiResponse, ClientError> {
    if response.status == 204 {
        return Ok(ApiResponse::Empty);
    }
    if !response.is_success() {
        return Err(ApiError::from_raw(response.status, &response.body).into());
    }
    Ok(ApiResponse::parse(&response.body))
}
