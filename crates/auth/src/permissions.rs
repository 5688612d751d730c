use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Separator between the resource and action halves of a permission.
pub const SEPARATOR: char = ':';

/// The universal grant.
pub const WILDCARD: &str = "*";

/// Requested permission identifier.
///
/// Permissions are modeled as opaque strings of the form `resource:action`
/// (e.g. "invoices:read"). Malformed strings are accepted here and simply
/// never match a resource wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == WILDCARD
    }

    /// Resource half, split on the first separator. `None` when malformed.
    pub fn resource(&self) -> Option<&str> {
        self.as_str().split_once(SEPARATOR).map(|(resource, _)| resource)
    }

    /// Action half, split on the first separator. `None` when malformed.
    pub fn action(&self) -> Option<&str> {
        self.as_str().split_once(SEPARATOR).map(|(_, action)| action)
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Permission {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A parsed grant held by a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grant {
    /// `*` — every permission.
    All,
    /// `resource:*` — every action on one resource.
    Resource(String),
    /// `resource:action`, or any other literal string.
    Exact(String),
}

impl Grant {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == WILDCARD {
            return Grant::All;
        }
        match raw.split_once(SEPARATOR) {
            Some((resource, "*")) if !resource.is_empty() => Grant::Resource(resource.to_string()),
            _ => Grant::Exact(raw.to_string()),
        }
    }

    /// Whether this grant on its own allows `permission`.
    pub fn allows(&self, permission: &Permission) -> bool {
        match self {
            Grant::All => true,
            Grant::Exact(exact) => exact == permission.as_str(),
            Grant::Resource(resource) => permission.resource() == Some(resource.as_str()),
        }
    }
}

impl core::fmt::Display for Grant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Grant::All => f.write_str(WILDCARD),
            Grant::Resource(resource) => write!(f, "{resource}{SEPARATOR}*"),
            Grant::Exact(exact) => f.write_str(exact),
        }
    }
}

impl From<&str> for Grant {
    fn from(value: &str) -> Self {
        Grant::parse(value)
    }
}

impl Serialize for Grant {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Grant {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Grant::parse(&raw))
    }
}
