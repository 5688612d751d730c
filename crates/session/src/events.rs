//! Session lifecycle notifications.
//!
//! Hosts observe the session through this bus instead of the core performing
//! navigation itself: a UI redirects to its login surface on
//! [`SessionEvent::SessionExpired`], a CLI prints a hint, a service drops the
//! tenant's cached state.
//!
//! Delivery is best-effort fan-out. Subscribers that have gone away are pruned
//! on the next publish.

use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

/// Something that happened to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Refreshed,
    /// Explicit logout. Credentials are already cleared.
    LoggedOut,
    /// The session could not be renewed. Credentials are already cleared; the
    /// host should send the user back to a login surface.
    SessionExpired { reason: String },
}

impl SessionEvent {
    /// Whether the host should treat this as "re-authenticate".
    pub fn requires_login(&self) -> bool {
        matches!(self, SessionEvent::LoggedOut | SessionEvent::SessionExpired { .. })
    }
}

/// Receiving end of a subscription.
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: mpsc::Receiver<SessionEvent>,
}

impl SessionSubscription {
    /// Block until the next event.
    pub fn recv(&self) -> Result<SessionEvent, mpsc::RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<SessionEvent, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything published so far, without blocking.
    pub fn drain(&self) -> Vec<SessionEvent> {
        self.receiver.try_iter().collect()
    }
}

/// Callback invoked synchronously on publish.
pub type SessionListener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Fan-out of session events to channel subscribers and callbacks.
#[derive(Default)]
pub struct SessionEvents {
    subscribers: Mutex<Vec<mpsc::Sender<SessionEvent>>>,
    listeners: Mutex<Vec<SessionListener>>,
}

impl core::fmt::Debug for SessionEvents {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let subscribers = self.subscribers.lock().map(|s| s.len()).unwrap_or(0);
        let listeners = self.listeners.lock().map(|l| l.len()).unwrap_or(0);
        f.debug_struct("SessionEvents")
            .field("subscribers", &subscribers)
            .field("listeners", &listeners)
            .finish()
    }
}

impl SessionEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> SessionSubscription {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(tx);
        SessionSubscription { receiver: rx }
    }

    /// Register a callback. Listeners must not block.
    pub fn on_event(&self, listener: SessionListener) {
        self.listeners
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(listener);
    }

    pub fn publish(&self, event: SessionEvent) {
        tracing::debug!(?event, "session event");

        {
            let mut subs = self.subscribers.lock().unwrap_or_else(|p| p.into_inner());
            // Drop any dead subscribers while publishing.
            subs.retain(|tx| tx.send(event.clone()).is_ok());
        }

        // Clone out so a listener can register another listener without deadlocking.
        let listeners: Vec<SessionListener> = self
            .listeners
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        for listener in listeners {
            listener(&event);
        }
    }
}
