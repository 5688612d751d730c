//! `fieldline-auth` — role-based permission engine.
//!
//! Pure functions over an immutable grant table. No IO, no network state, safe
//! to call from any number of threads.

pub mod authorize;
pub mod grants;
pub mod permissions;
pub mod roles;

pub use authorize::{
    AuthorizationExplanation, AuthzError, PermissionEngine, default_table, has_all, has_any,
    has_permission,
};
pub use grants::{GrantTable, GrantTableBuilder, RoleDefinition};
pub use permissions::{Grant, Permission};
pub use roles::{Role, UnknownRole, normalize_optional_role, normalize_role, role_at_least};
