use anyhow::Result;
use fieldline_session::Method;
use serde_json::Value;

use crate::cli::globals::GlobalArgs;

pub mod authz;
pub mod session;

pub enum Action {
    Login {
        globals: GlobalArgs,
        identifier: String,
        secret: String,
    },
    Logout {
        globals: GlobalArgs,
    },
    Request {
        globals: GlobalArgs,
        method: Method,
        path: String,
        data: Option<Value>,
    },
    Can {
        role: String,
        permissions: Vec<String>,
    },
    Roles,
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the underlying session call fails or a permission
    /// check is denied.
    pub async fn execute(self) -> Result<()> {
        match self {
            Action::Login {
                globals,
                identifier,
                secret,
            } => session::login(&globals, &identifier, &secret).await,
            Action::Logout { globals } => session::logout(&globals).await,
            Action::Request {
                globals,
                method,
                path,
                data,
            } => session::request(&globals, method, &path, data).await,
            Action::Can { role, permissions } => authz::can(&role, &permissions),
            Action::Roles => authz::roles(),
        }
    }
}

impl core::fmt::Debug for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Action::Login {
                globals,
                identifier,
                ..
            } => f
                .debug_struct("Login")
                .field("globals", globals)
                .field("identifier", identifier)
                .field("secret", &"<redacted>")
                .finish(),
            Action::Logout { globals } => {
                f.debug_struct("Logout").field("globals", globals).finish()
            }
            Action::Request {
                globals,
                method,
                path,
                data,
            } => f
                .debug_struct("Request")
                .field("globals", globals)
                .field("method", method)
                .field("path", path)
                .field("data", data)
                .finish(),
            Action::Can { role, permissions } => f
                .debug_struct("Can")
                .field("role", role)
                .field("permissions", permissions)
                .finish(),
            Action::Roles => f.write_str("Roles"),
        }
    }
}
