use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use fieldline_session::{ApiClient, ClientConfig, FileCredentialStore, SessionManager};

/// Options shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub api_url: Option<String>,
    pub credentials_file: Option<PathBuf>,
}

impl GlobalArgs {
    /// Environment-derived config with `--api-url` taking precedence.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let config = ClientConfig::from_env();
        match &self.api_url {
            Some(url) => config.with_base_url(url.clone()),
            None => config,
        }
    }

    /// # Errors
    /// Returns an error if no path was given and the platform has no data dir.
    pub fn credentials_path(&self) -> Result<PathBuf> {
        match &self.credentials_file {
            Some(path) => Ok(path.clone()),
            None => FileCredentialStore::default_path()
                .context("no data directory on this platform; pass --credentials-file"),
        }
    }

    /// # Errors
    /// Returns an error if the credentials path or HTTP client cannot be set up.
    pub fn session(&self) -> Result<SessionManager> {
        let store = FileCredentialStore::new(self.credentials_path()?);
        let session = SessionManager::with_http(self.config(), Arc::new(store))
            .context("failed to build http client")?;

        session.on_session_expired(|reason| {
            eprintln!("Session expired ({reason}). Run `fieldline login` to sign in again.");
        });

        Ok(session)
    }

    /// # Errors
    /// See [`GlobalArgs::session`].
    pub fn client(&self) -> Result<ApiClient> {
        Ok(ApiClient::new(self.session()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_overrides_env() {
        temp_env::with_var("FIELDLINE_API_URL", Some("https://env.fieldline.test"), || {
            let globals = GlobalArgs {
                api_url: Some("https://flag.fieldline.test".to_string()),
                credentials_file: None,
            };
            assert_eq!(globals.config().base_url, "https://flag.fieldline.test");

            let from_env = GlobalArgs::default();
            assert_eq!(from_env.config().base_url, "https://env.fieldline.test");
        });
    }

    #[test]
    fn test_explicit_credentials_path() {
        let globals = GlobalArgs {
            api_url: None,
            credentials_file: Some(PathBuf::from("/tmp/fieldline-test.json")),
        };
        assert_eq!(
            globals.credentials_path().unwrap(),
            PathBuf::from("/tmp/fieldline-test.json")
        );
    }
}
