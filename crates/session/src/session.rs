//! Session manager: owns the token lifecycle.
//!
//! ```text
//! Anonymous --login--> Authenticated --401--> Refreshing --ok--> Authenticated
//!     ^                      |                    |
//!     +-------logout---------+-------failure------+
//! ```
//!
//! ## Single-flight refresh
//!
//! Many backends invalidate a refresh token after its first use, so N callers
//! that each see a 401 must not each refresh. The first caller spawns the
//! refresh as its own task and parks a `watch` receiver in `refresh_slot`;
//! later callers clone that receiver and wait for the same outcome. Because the
//! work runs in a spawned task, a caller that gives up (timeout, navigation,
//! dropped future) never cancels the refresh for everyone else. The slot is
//! released by a drop guard, so it cannot get stuck in "refreshing".
//!
//! All credential writes happen under `epoch`. Login and logout bump it; a
//! refresh that started under an older epoch discards its result instead of
//! resurrecting a session the user already ended.

use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, Credentials};
use crate::error::{ApiError, AuthError, RefreshError, StoreError, TransportError};
use crate::events::{SessionEvent, SessionEvents, SessionListener, SessionSubscription};
use crate::transport::{
    HttpTransport, Method, RequestBody, Transport, TransportRequest, TransportResponse,
};

type RefreshOutcome = Result<Credentials, RefreshError>;
type RefreshReceiver = watch::Receiver<Option<RefreshOutcome>>;

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
    Refreshing,
}

/// Handle to the session. Cheap to clone; clones share state.
#[derive(Clone, Debug)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    events: SessionEvents,
    epoch: Mutex<u64>,
    refresh_slot: Mutex<Option<RefreshReceiver>>,
}

impl core::fmt::Debug for Inner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                store,
                events: SessionEvents::new(),
                epoch: Mutex::new(0),
                refresh_slot: Mutex::new(None),
            }),
        }
    }

    /// Session over the default `reqwest` transport.
    pub fn with_http(
        config: ClientConfig,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::new(config, Arc::new(transport), store))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.inner.transport
    }

    pub fn subscribe(&self) -> SessionSubscription {
        self.inner.events.subscribe()
    }

    /// Register a callback for every session event.
    pub fn on_event(&self, listener: SessionListener) {
        self.inner.events.on_event(listener);
    }

    /// Register a callback fired only when the session expires.
    ///
    /// This is where a UI host redirects to its login page.
    pub fn on_session_expired<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.events.on_event(Arc::new(move |event| {
            if let SessionEvent::SessionExpired { reason } = event {
                callback(reason);
            }
        }));
    }

    /// Snapshot of the stored credentials.
    pub fn current(&self) -> Result<Option<Credentials>, StoreError> {
        self.inner.store.get()
    }

    pub fn state(&self) -> SessionState {
        if self.refresh_in_flight() {
            return SessionState::Refreshing;
        }
        match self.inner.store.get() {
            Ok(Some(_)) => SessionState::Authenticated,
            _ => SessionState::Anonymous,
        }
    }

    /// Whether a refresh is running and has not reported its outcome yet.
    pub fn refresh_in_flight(&self) -> bool {
        self.inner
            .refresh_slot
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .is_some_and(|receiver| receiver.borrow().is_none())
    }

    /// Exchange an identifier/secret for credentials and store them.
    ///
    /// The store is untouched on any failure.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Credentials, AuthError> {
        let config = &self.inner.config;
        let request = TransportRequest {
            method: Method::POST,
            url: config.url(&config.login_path),
            headers: Vec::new(),
            body: RequestBody::Json(json!({ "identifier": identifier, "secret": secret })),
        };

        let response = self.inner.transport.execute(request).await?;

        match response.status {
            200..=299 => {}
            400 | 401 | 403 => {
                tracing::info!(status = response.status, "login rejected");
                return Err(AuthError::InvalidCredentials);
            }
            status => return Err(ApiError::from_raw(status, &response.body).into()),
        }

        let credentials = parse_token_pair(&response).map_err(AuthError::Malformed)?;

        {
            let mut epoch = self.inner.lock_epoch();
            self.inner.store.set(credentials.clone())?;
            *epoch += 1;
        }

        tracing::info!("login succeeded");
        self.inner.events.publish(SessionEvent::LoggedIn);
        Ok(credentials)
    }

    /// End the session.
    ///
    /// The remote invalidation call is best-effort; local credentials are
    /// always cleared and subscribers are always notified.
    pub async fn logout(&self) {
        let current = self.inner.store.get().ok().flatten();

        if let Some(credentials) = current {
            let config = &self.inner.config;
            let request = TransportRequest {
                method: Method::POST,
                url: config.url(&config.logout_path),
                headers: vec![("Authorization".to_string(), credentials.bearer())],
                body: RequestBody::Empty,
            };
            match self.inner.transport.execute(request).await {
                Ok(response) if response.is_success() => {}
                Ok(response) => {
                    tracing::debug!(status = response.status, "remote logout rejected; ignoring")
                }
                Err(err) => tracing::debug!(error = %err, "remote logout failed; ignoring"),
            }
        }

        {
            let mut epoch = self.inner.lock_epoch();
            if let Err(err) = self.inner.store.clear() {
                tracing::warn!(error = %err, "failed to clear credentials on logout");
            }
            *epoch += 1;
        }

        tracing::info!("logged out");
        self.inner.events.publish(SessionEvent::LoggedOut);
    }

    /// Obtain fresh credentials using the stored refresh token.
    ///
    /// Concurrent callers share one in-flight refresh and all observe its
    /// outcome. On failure the session is already cleared and
    /// [`SessionEvent::SessionExpired`] has been published.
    pub async fn refresh(&self) -> Result<Credentials, RefreshError> {
        let mut receiver = self.join_or_start_refresh();

        let outcome = match receiver.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            Err(_) => None,
        };

        match outcome {
            Some(outcome) => outcome,
            None => {
                // The refresh task went away without reporting.
                let err = RefreshError::Aborted;
                self.inner.expire(&err.to_string());
                Err(err)
            }
        }
    }

    /// Clear the session and publish `SessionExpired`.
    ///
    /// Used by the dispatcher when a request is still rejected after a
    /// successful refresh.
    pub(crate) fn expire(&self, reason: &str) {
        self.inner.expire(reason);
    }

    fn join_or_start_refresh(&self) -> RefreshReceiver {
        let mut slot = self
            .inner
            .refresh_slot
            .lock()
            .unwrap_or_else(|p| p.into_inner());

        if let Some(receiver) = slot.as_ref() {
            tracing::debug!("joining in-flight refresh");
            return receiver.clone();
        }

        let (sender, receiver) = watch::channel(None);
        *slot = Some(receiver.clone());
        drop(slot);

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let release = SlotRelease {
                inner: inner.clone(),
            };
            let outcome = inner.run_refresh().await;
            // Outcome first, then the slot: late joiners read this outcome.
            sender.send_replace(Some(outcome));
            drop(release);
        });

        receiver
    }
}

impl Inner {
    fn lock_epoch(&self) -> std::sync::MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Clear the store and publish `SessionExpired`, once per session: if the
    /// store is already anonymous nothing is published.
    fn expire(&self, reason: &str) {
        {
            let mut epoch = self.lock_epoch();
            if matches!(self.store.get(), Ok(None)) {
                tracing::debug!(%reason, "session already anonymous; not expiring again");
                return;
            }
            if let Err(err) = self.store.clear() {
                tracing::warn!(error = %err, "failed to clear credentials on session expiry");
            }
            *epoch += 1;
        }
        tracing::warn!(%reason, "session expired");
        self.events.publish(SessionEvent::SessionExpired {
            reason: reason.to_string(),
        });
    }

    async fn run_refresh(&self) -> RefreshOutcome {
        let started_epoch = *self.lock_epoch();

        let result = match tokio::time::timeout(self.config.refresh_timeout, self.request_refresh())
            .await
        {
            Ok(result) => result,
            Err(_) => Err(RefreshError::Timeout),
        };

        let epoch = self.lock_epoch();
        if *epoch != started_epoch {
            // Login/logout won the race; the store already reflects the user's intent.
            drop(epoch);
            tracing::info!("discarding refresh result; session changed while refreshing");
            return match self.store.get() {
                Ok(Some(current)) => Ok(current),
                _ => Err(RefreshError::Superseded),
            };
        }

        match result {
            Ok(credentials) => match self.store.set(credentials.clone()) {
                Ok(()) => {
                    drop(epoch);
                    tracing::info!("session refreshed");
                    self.events.publish(SessionEvent::Refreshed);
                    Ok(credentials)
                }
                Err(err) => {
                    drop(epoch);
                    let err = RefreshError::Store(err);
                    self.expire(&err.to_string());
                    Err(err)
                }
            },
            Err(err) => {
                drop(epoch);
                self.expire(&err.to_string());
                Err(err)
            }
        }
    }

    async fn request_refresh(&self) -> RefreshOutcome {
        let Some(current) = self.store.get().map_err(RefreshError::Store)? else {
            return Err(RefreshError::MissingRefreshToken);
        };

        let request = TransportRequest {
            method: Method::POST,
            url: self.config.url(&self.config.refresh_path),
            headers: Vec::new(),
            body: RequestBody::Json(json!({ "refreshToken": current.refresh_token })),
        };

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(RefreshError::Transport)?;

        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status,
            });
        }

        parse_token_pair(&response).map_err(RefreshError::Malformed)
    }
}

/// Releases the in-flight slot however the refresh task ends (including panics
/// and runtime shutdown).
struct SlotRelease {
    inner: Arc<Inner>,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        self.inner
            .refresh_slot
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
    }
}

fn parse_token_pair(response: &TransportResponse) -> Result<Credentials, String> {
    let credentials: Credentials =
        serde_json::from_slice(&response.body).map_err(|e| e.to_string())?;
    if credentials.is_complete() {
        Ok(credentials)
    } else {
        Err("token pair is incomplete".to_string())
    }
}
