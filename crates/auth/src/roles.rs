use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role used for RBAC, ordered from least to most privileged.
///
/// The derived `Ord` is the role hierarchy: `Viewer < Field < Manager < Admin < Owner`.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Viewer,
    #[serde(alias = "user")]
    Field,
    Manager,
    Admin,
    Owner,
}

impl Role {
    /// All roles in hierarchy order.
    pub const ALL: [Role; 5] = [
        Role::Viewer,
        Role::Field,
        Role::Manager,
        Role::Admin,
        Role::Owner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Field => "field",
            Role::Manager => "manager",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Position in the hierarchy (0 = least privileged).
    pub fn level(&self) -> usize {
        *self as usize
    }

    /// Whether this role is at least as privileged as `min`.
    pub fn at_least(&self, min: Role) -> bool {
        *self >= min
    }

    fn parse_known(name: &str) -> Option<Role> {
        match name {
            "viewer" => Some(Role::Viewer),
            "field" => Some(Role::Field),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            "owner" => Some(Role::Owner),
            // Legacy alias kept for accounts created before field roles existed.
            "user" => Some(Role::Field),
            _ => None,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

/// Strict parse: the exact canonical names and the `user` alias only.
///
/// Matching is case- and whitespace-sensitive; `"ADMIN"` is not `admin`.
impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse_known(s).ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Map a raw role name onto a known role.
///
/// Legacy aliases resolve to their replacement (`user` → `field`). Anything
/// else that is not an exact role name, including an empty name or a
/// differently-cased one, falls back to `viewer`.
pub fn normalize_role(role: &str) -> Role {
    match role.parse::<Role>() {
        Ok(role) => role,
        Err(_) => {
            if !role.is_empty() {
                tracing::warn!(role = %role, "unrecognised role; treating as viewer");
            }
            Role::Viewer
        }
    }
}

/// Normalise an optional role claim (missing → `viewer`).
pub fn normalize_optional_role(role: Option<&str>) -> Role {
    role.map(normalize_role).unwrap_or_default()
}

/// Hierarchy comparison over raw role names. Both sides are normalised first.
pub fn role_at_least(role: &str, min_role: &str) -> bool {
    normalize_role(role).at_least(normalize_role(min_role))
}
