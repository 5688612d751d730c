use std::sync::OnceLock;

use serde::Serialize;
use thiserror::Error;

use crate::{normalize_role, Grant, GrantTable, Permission, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: role '{role}' is missing permission '{permission}'")]
    Forbidden { role: Role, permission: String },
}

/// Permission checks over an injected [`GrantTable`].
///
/// - No IO
/// - No panics
/// - Same `(role, permission)` always yields the same answer
#[derive(Debug, Clone, Copy)]
pub struct PermissionEngine<'a> {
    table: &'a GrantTable,
}

impl<'a> PermissionEngine<'a> {
    pub fn new(table: &'a GrantTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'a GrantTable {
        self.table
    }

    /// Resolution order: owner, `*`, exact grant, `{resource}:*`, deny.
    pub fn has_permission(&self, role: Role, permission: &Permission) -> bool {
        self.matching_grant(role, permission).is_some() || role == Role::Owner
    }

    pub fn has_any(&self, role: Role, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.has_permission(role, p))
    }

    pub fn has_all(&self, role: Role, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.has_permission(role, p))
    }

    /// Check a raw role name (normalised first).
    pub fn check(&self, role: &str, permission: &str) -> bool {
        self.has_permission(normalize_role(role), &Permission::new(permission.to_string()))
    }

    /// Guard form of [`Self::has_permission`].
    pub fn require(&self, role: Role, permission: &Permission) -> Result<(), AuthzError> {
        if self.has_permission(role, permission) {
            Ok(())
        } else {
            Err(AuthzError::Forbidden {
                role,
                permission: permission.as_str().to_string(),
            })
        }
    }

    fn matching_grant(&self, role: Role, permission: &Permission) -> Option<Grant> {
        let grants = self.table.grants_for(role);

        if grants.contains(&Grant::All) {
            return Some(Grant::All);
        }

        let exact = Grant::Exact(permission.as_str().to_string());
        if grants.contains(&exact) {
            return Some(exact);
        }

        let resource = Grant::Resource(permission.resource()?.to_string());
        grants.contains(&resource).then_some(resource)
    }

    /// Explain why a check would be allowed or denied.
    pub fn explain(&self, role: &str, permission: &str) -> AuthorizationExplanation {
        let resolved = normalize_role(role);
        let permission = Permission::new(permission.to_string());
        let matched = self.matching_grant(resolved, &permission);
        let granted = matched.is_some() || resolved == Role::Owner;
        let defined = self.table.defines(resolved);

        let reason = match (&matched, granted) {
            (Some(Grant::All), _) => "role holds the universal grant '*'".to_string(),
            (Some(grant), _) => format!("role holds grant '{grant}'"),
            (None, true) => "owner is always allowed".to_string(),
            (None, false) if permission.resource().is_none() => format!(
                "permission '{}' is not of the form resource:action and no grant matches it exactly",
                permission
            ),
            (None, false) => format!("no grant of role '{resolved}' covers '{permission}'"),
        };

        let suggestions = if granted {
            Vec::new()
        } else {
            Role::ALL
                .iter()
                .copied()
                .filter(|r| *r > resolved && self.has_permission(*r, &permission))
                .map(|r| format!("role '{r}' would grant '{permission}'"))
                .collect()
        };

        AuthorizationExplanation {
            requested_role: role.to_string(),
            resolved_role: resolved,
            role_defined: defined,
            permission: permission.as_str().to_string(),
            granted,
            matched_grant: matched.map(|g| g.to_string()),
            reason,
            suggestions,
        }
    }
}

/// Auditable record of a permission decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    /// Role name as supplied by the caller.
    pub requested_role: String,
    /// Role the name resolved to after normalisation.
    pub resolved_role: Role,
    /// Whether the table has an explicit entry for the resolved role.
    pub role_defined: bool,
    pub permission: String,
    pub granted: bool,
    pub matched_grant: Option<String>,
    pub reason: String,
    pub suggestions: Vec<String>,
}

/// Process-wide CRM grant table, built on first use.
pub fn default_table() -> &'static GrantTable {
    static TABLE: OnceLock<GrantTable> = OnceLock::new();
    TABLE.get_or_init(GrantTable::crm_default)
}

fn default_engine() -> PermissionEngine<'static> {
    PermissionEngine::new(default_table())
}

/// Check `permission` for a raw role name against the default table.
pub fn has_permission(role: &str, permission: &str) -> bool {
    default_engine().check(role, permission)
}

pub fn has_any<S: AsRef<str>>(role: &str, permissions: &[S]) -> bool {
    let role = normalize_role(role);
    let engine = default_engine();
    permissions
        .iter()
        .any(|p| engine.has_permission(role, &Permission::new(p.as_ref().to_string())))
}

pub fn has_all<S: AsRef<str>>(role: &str, permissions: &[S]) -> bool {
    let role = normalize_role(role);
    let engine = default_engine();
    permissions
        .iter()
        .all(|p| engine.has_permission(role, &Permission::new(p.as_ref().to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn perms(names: &[&'static str]) -> Vec<Permission> {
        names.iter().map(|n| Permission::new(*n)).collect()
    }

    #[test]
    fn manager_reads_invoices_but_cannot_delete_them() {
        assert!(has_permission("manager", "invoices:read"));
        assert!(!has_permission("manager", "invoices:delete"));
    }

    #[test]
    fn admin_resource_wildcard_covers_every_invoice_action() {
        assert!(has_permission("admin", "invoices:read"));
        assert!(has_permission("admin", "invoices:delete"));
        assert!(has_permission("admin", "invoices:void"));
    }

    #[test]
    fn unknown_role_is_fail_closed() {
        assert!(!has_permission("bogus-role", "contacts:read"));
        assert!(!has_permission("", "contacts:read"));
        // Same answer as a viewer, never more.
        assert!(has_permission("bogus-role", "jobs:read"));
    }

    #[test]
    fn differently_cased_privileged_role_gets_viewer_grants() {
        assert!(!has_permission("ADMIN", "settings:update"));
        assert!(!has_permission("Owner", "billing:close"));
        assert!(!has_permission(" manager", "invoices:read"));
        assert!(has_permission("ADMIN", "jobs:read"));
    }

    #[test]
    fn legacy_user_role_behaves_like_field() {
        assert!(has_permission("user", "timesheets:submit"));
        assert!(!has_permission("user", "quotes:create"));
    }

    #[test]
    fn malformed_permission_denied_without_panicking() {
        let table = GrantTable::builder().role(Role::Manager, ["contacts:*"]).build();
        let engine = PermissionEngine::new(&table);
        assert!(!engine.check("manager", "contacts"));
        assert!(!engine.check("manager", ""));
        assert!(!engine.check("manager", ":"));
    }

    #[test]
    fn owner_is_allowed_even_without_a_table_entry() {
        let table = GrantTable::default();
        let engine = PermissionEngine::new(&table);
        assert!(engine.check("owner", "anything:at-all"));
        assert!(engine.check("owner", "no separator"));
    }

    #[test]
    fn universal_grant_allows_malformed_strings() {
        let table = GrantTable::builder().role(Role::Field, ["*"]).build();
        let engine = PermissionEngine::new(&table);
        assert!(engine.check("field", "nonsense"));
    }

    #[test]
    fn has_any_and_has_all_fold_over_single_checks() {
        let table = GrantTable::crm_default();
        let engine = PermissionEngine::new(&table);
        let mixed = perms(&["invoices:read", "invoices:delete"]);
        assert!(engine.has_any(Role::Manager, &mixed));
        assert!(!engine.has_all(Role::Manager, &mixed));
        assert!(engine.has_all(Role::Admin, &mixed));
        assert!(!engine.has_any(Role::Manager, &[]));
        assert!(engine.has_all(Role::Viewer, &[]));

        assert!(has_any("field", &["quotes:create", "jobs:update"]));
        assert!(!has_all("field", &["quotes:create", "jobs:update"]));
    }

    #[test]
    fn require_reports_the_missing_permission() {
        let table = GrantTable::crm_default();
        let engine = PermissionEngine::new(&table);
        let err = engine
            .require(Role::Viewer, &Permission::new("settings:update"))
            .unwrap_err();
        assert_eq!(
            err,
            AuthzError::Forbidden {
                role: Role::Viewer,
                permission: "settings:update".to_string()
            }
        );
        assert!(engine.require(Role::Admin, &Permission::new("settings:update")).is_ok());
    }

    #[test]
    fn explain_names_the_matching_grant() {
        let table = GrantTable::crm_default();
        let engine = PermissionEngine::new(&table);

        let allowed = engine.explain("admin", "invoices:delete");
        assert!(allowed.granted);
        assert_eq!(allowed.matched_grant.as_deref(), Some("invoices:*"));

        let denied = engine.explain("manager", "invoices:delete");
        assert!(!denied.granted);
        assert!(denied.matched_grant.is_none());
        assert!(denied.suggestions.iter().any(|s| s.contains("'admin'")));

        let unknown = engine.explain("intern", "contacts:read");
        assert_eq!(unknown.resolved_role, Role::Viewer);
        assert!(!unknown.granted);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: owner is allowed any permission string, malformed or not.
        #[test]
        fn owner_allows_any_string(permission in ".*") {
            prop_assert!(has_permission("owner", &permission));
        }

        /// Property: repeated checks give identical answers.
        #[test]
        fn resolution_is_deterministic(
            role in "[a-z]{0,8}",
            resource in "[a-z]{1,10}",
            action in "[a-z*]{1,6}",
        ) {
            let permission = format!("{resource}:{action}");
            let first = has_permission(&role, &permission);
            for _ in 0..4 {
                prop_assert_eq!(has_permission(&role, &permission), first);
            }
        }

        /// Property: in the default table a higher role never loses a permission
        /// held by a lower one.
        #[test]
        fn higher_roles_keep_lower_role_permissions(
            resource in prop::sample::select(vec![
                "contacts", "jobs", "quotes", "invoices", "equipment", "fleet",
                "pricebook", "schedule", "reports", "users", "settings", "dashboard",
                "timesheets",
            ]),
            action in prop::sample::select(vec!["read", "create", "update", "delete"]),
        ) {
            let permission = Permission::new(format!("{resource}:{action}"));
            let engine = default_engine();
            for window in Role::ALL.windows(2) {
                if engine.has_permission(window[0], &permission) {
                    prop_assert!(engine.has_permission(window[1], &permission));
                }
            }
        }
    }
}
