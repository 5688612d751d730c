//! Static role → grant table.
//!
//! A table is built once (usually at startup) and never mutated afterwards;
//! share it by reference or `Arc`.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::{Grant, Role};

static NO_GRANTS: BTreeSet<Grant> = BTreeSet::new();

/// Immutable mapping of roles to their grants.
#[derive(Debug, Clone, Default)]
pub struct GrantTable {
    grants: HashMap<Role, BTreeSet<Grant>>,
}

impl GrantTable {
    pub fn builder() -> GrantTableBuilder {
        GrantTableBuilder::default()
    }

    /// Grant table for the CRM client.
    ///
    /// Each role extends the one below it. Viewers see scheduling data only;
    /// contact records (customer PII) start at `field`.
    pub fn crm_default() -> Self {
        Self::builder()
            .role(Role::Viewer, ["dashboard:read", "jobs:read", "schedule:read"])
            .extend(
                Role::Field,
                Role::Viewer,
                [
                    "jobs:update",
                    "contacts:read",
                    "equipment:read",
                    "fleet:read",
                    "timesheets:*",
                    "pricebook:read",
                ],
            )
            .extend(
                Role::Manager,
                Role::Field,
                [
                    "contacts:*",
                    "jobs:*",
                    "quotes:*",
                    "schedule:*",
                    "invoices:read",
                    "equipment:*",
                    "fleet:*",
                    "reports:read",
                ],
            )
            .extend(
                Role::Admin,
                Role::Manager,
                ["invoices:*", "pricebook:*", "reports:*", "users:*", "settings:*"],
            )
            .role(Role::Owner, ["*"])
            .build()
    }

    /// Whether the table has an explicit entry for `role`.
    pub fn defines(&self, role: Role) -> bool {
        self.grants.contains_key(&role)
    }

    /// Grants held by `role`.
    ///
    /// A role missing from the table gets exactly what `viewer` gets (and
    /// nothing at all if `viewer` is missing too).
    pub fn grants_for(&self, role: Role) -> &BTreeSet<Grant> {
        self.grants
            .get(&role)
            .or_else(|| self.grants.get(&Role::Viewer))
            .unwrap_or(&NO_GRANTS)
    }

    /// Role definitions in hierarchy order, for audit/display.
    pub fn definitions(&self) -> Vec<RoleDefinition> {
        Role::ALL
            .iter()
            .map(|role| RoleDefinition {
                name: role.as_str().to_string(),
                level: role.level(),
                grants: self.grants_for(*role).iter().map(Grant::to_string).collect(),
                inherited_from_viewer: !self.defines(*role),
                description: role_description(*role).to_string(),
            })
            .collect()
    }
}

/// Builder for [`GrantTable`].
#[derive(Debug, Default)]
pub struct GrantTableBuilder {
    grants: HashMap<Role, BTreeSet<Grant>>,
}

impl GrantTableBuilder {
    /// Add grants to `role` (accumulates across calls).
    pub fn role<I, S>(mut self, role: Role, grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.grants
            .entry(role)
            .or_default()
            .extend(grants.into_iter().map(|g| Grant::parse(g.as_ref())));
        self
    }

    /// Give `role` everything `base` has so far, plus `grants`.
    pub fn extend<I, S>(mut self, role: Role, base: Role, grants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let inherited = self.grants.get(&base).cloned().unwrap_or_default();
        self.grants.entry(role).or_default().extend(inherited);
        self.role(role, grants)
    }

    pub fn build(self) -> GrantTable {
        GrantTable { grants: self.grants }
    }
}

/// Role definition with its grants (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub name: String,
    pub level: usize,
    pub grants: Vec<String>,
    pub inherited_from_viewer: bool,
    pub description: String,
}

fn role_description(role: Role) -> &'static str {
    match role {
        Role::Viewer => "Read-only access to the dashboard and schedule",
        Role::Field => "Technician working assigned jobs in the field",
        Role::Manager => "Office manager running customers, jobs and quotes",
        Role::Admin => "Administrator with billing, user and settings access",
        Role::Owner => "Account owner with unrestricted access",
    }
}
