//! Client configuration (endpoints and timeouts).

use std::time::Duration;

pub const DEFAULT_LOGIN_PATH: &str = "/auth/login";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const DEFAULT_LOGOUT_PATH: &str = "/auth/logout";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_API_URL: &str = "FIELDLINE_API_URL";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "FIELDLINE_REQUEST_TIMEOUT_MS";
pub const ENV_REFRESH_TIMEOUT_MS: &str = "FIELDLINE_REFRESH_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the API (e.g. `https://api.example.com/v1`).
    pub base_url: String,
    pub login_path: String,
    pub refresh_path: String,
    pub logout_path: String,
    /// Upper bound for every transport call.
    pub request_timeout: Duration,
    /// Upper bound for a whole refresh operation.
    pub refresh_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            logout_path: DEFAULT_LOGOUT_PATH.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    /// Load from `FIELDLINE_*` environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                config.base_url = url.trim().to_string();
            }
        }
        if let Some(timeout) = duration_from_env(ENV_REQUEST_TIMEOUT_MS) {
            config.request_timeout = timeout;
        }
        if let Some(timeout) = duration_from_env(ENV_REFRESH_TIMEOUT_MS) {
            config.refresh_timeout = timeout;
        }

        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn with_logout_path(mut self, path: impl Into<String>) -> Self {
        self.logout_path = path.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Join `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Whether `path` addresses the refresh endpoint (never refreshed-and-retried).
    pub fn is_refresh_path(&self, path: &str) -> bool {
        normalize_path(path) == normalize_path(&self.refresh_path)
    }
}

fn duration_from_env(key: &str) -> Option<Duration> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => {
            tracing::warn!(%key, value = %raw, "ignoring invalid timeout; using default");
            None
        }
        Ok(ms) => Some(Duration::from_millis(ms)),
    }
}

fn normalize_path(path: &str) -> &str {
    let path = path.trim();
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.trim_matches('/')
}

/// Join a base URL and a path with exactly one slash between them.
pub fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else if path.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_collapses_slashes() {
        assert_eq!(join_url("http://api/", "/contacts"), "http://api/contacts");
        assert_eq!(join_url("http://api", "contacts"), "http://api/contacts");
        assert_eq!(join_url("", "/contacts"), "/contacts");
        assert_eq!(join_url("http://api/v1/", ""), "http://api/v1");
    }

    #[test]
    fn refresh_path_detection_ignores_slashes_and_query() {
        let config = ClientConfig::new("http://api");
        assert!(config.is_refresh_path("/auth/refresh"));
        assert!(config.is_refresh_path("auth/refresh/"));
        assert!(config.is_refresh_path("/auth/refresh?x=1"));
        assert!(!config.is_refresh_path("/auth/refresh-all"));
        assert!(!config.is_refresh_path("/contacts"));
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = ClientConfig::new("http://api")
            .with_refresh_path("/v2/token")
            .with_refresh_timeout(Duration::from_millis(250));
        assert_eq!(config.refresh_path, "/v2/token");
        assert_eq!(config.refresh_timeout, Duration::from_millis(250));
        assert_eq!(config.login_path, DEFAULT_LOGIN_PATH);
    }
}
