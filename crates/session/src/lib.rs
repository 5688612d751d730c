//! `fieldline-session` — session core for the CRM API client.
//!
//! - [`credentials`]: where the access/refresh pair lives
//! - [`session`]: login, logout and single-flight refresh
//! - [`dispatcher`]: authenticated requests with refresh-and-retry-once
//! - [`events`]: lifecycle notifications for the host (e.g. redirect on expiry)
//!
//! The crate is transport-agnostic at its core ([`transport::Transport`]); a
//! `reqwest` implementation is provided.

pub mod config;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod session;
pub mod transport;

pub use config::ClientConfig;
pub use credentials::{CredentialStore, Credentials, FileCredentialStore, InMemoryCredentialStore};
pub use dispatcher::{ApiClient, ApiRequest, ApiResponse};
pub use error::{ApiError, AuthError, ClientError, RefreshError, StoreError, TransportError};
pub use events::{SessionEvent, SessionEvents, SessionListener, SessionSubscription};
pub use session::{SessionManager, SessionState};
pub use transport::{HttpTransport, Method, RequestBody, Transport, TransportRequest, TransportResponse};
