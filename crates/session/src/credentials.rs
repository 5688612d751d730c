//! Credential storage.
//!
//! The anonymous state is the absence of a [`Credentials`] value, so a store
//! can never hold an access token without its refresh token (or vice versa).
//! Stores are written only by the session manager.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::StoreError;

/// Access/refresh token pair. Both tokens are opaque to this crate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(alias = "refresh_token")]
    pub refresh_token: String,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    pub(crate) fn is_complete(&self) -> bool {
        !self.access_token.trim().is_empty() && !self.refresh_token.trim().is_empty()
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Storage for the current credential pair.
///
/// `set` replaces both tokens at once; readers see either the old pair or the
/// new pair, never a mix.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<Option<Credentials>, StoreError>;

    fn set(&self, credentials: Credentials) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;
}

/// Process-local store. Sessions do not survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<Option<Credentials>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            inner: RwLock::new(Some(credentials)),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self) -> Result<Option<Credentials>, StoreError> {
        // A poisoned lock still holds a whole pair; recover it.
        let guard = self.inner.read().unwrap_or_else(|p| p.into_inner());
        Ok(guard.clone())
    }

    fn set(&self, credentials: Credentials) -> Result<(), StoreError> {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        *guard = Some(credentials);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut guard = self.inner.write().unwrap_or_else(|p| p.into_inner());
        *guard = None;
        Ok(())
    }
}

/// JSON file store; sessions survive process restarts.
///
/// Writes go to a uniquely named sibling temp file (owner-only permissions on
/// Unix) that is renamed into place.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    // Serialises writers within this process.
    lock: RwLock<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    /// `<data dir>/fieldline/credentials.json`, when the platform has a data dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("fieldline").join("credentials.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<Credentials>, StoreError> {
        let _guard = self.lock.read().unwrap_or_else(|p| p.into_inner());
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let credentials: Credentials = serde_json::from_str(&raw)?;
        Ok(credentials.is_complete().then_some(credentials))
    }

    fn set(&self, credentials: Credentials) -> Result<(), StoreError> {
        let _guard = self.lock.write().unwrap_or_else(|p| p.into_inner());
        let parent = self.parent_dir();
        std::fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(&serde_json::to_vec_pretty(&credentials)?)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.write().unwrap_or_else(|p| p.into_inner());
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
