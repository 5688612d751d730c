#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use fieldline_session::{
    ApiClient, ClientConfig, Credentials, InMemoryCredentialStore, SessionManager,
};
use serde_json::{Value, json};
use wiremock::MockServer;

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

pub fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.uri())
        .with_request_timeout(Duration::from_secs(5))
        .with_refresh_timeout(Duration::from_secs(5))
}

/// Client over a real HTTP transport, optionally already signed in.
pub fn client_for(
    server: &MockServer,
    credentials: Option<Credentials>,
) -> anyhow::Result<(ApiClient, Arc<InMemoryCredentialStore>)> {
    let store = Arc::new(match credentials {
        Some(credentials) => InMemoryCredentialStore::with_credentials(credentials),
        None => InMemoryCredentialStore::new(),
    });
    let session = SessionManager::with_http(config_for(server), store.clone())?;
    Ok((ApiClient::new(session), store))
}

pub fn token_pair(access: &str, refresh: &str) -> Value {
    json!({ "accessToken": access, "refreshToken": refresh })
}
