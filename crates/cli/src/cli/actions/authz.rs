use anyhow::Result;
use fieldline_auth::{AuthorizationExplanation, PermissionEngine, default_table};

/// Explanations for each permission against the default table.
#[must_use]
pub fn explain(role: &str, permissions: &[String]) -> Vec<AuthorizationExplanation> {
    let engine = PermissionEngine::new(default_table());
    permissions
        .iter()
        .map(|permission| engine.explain(role, permission))
        .collect()
}

/// Print the explanations; fails when any permission is missing so the
/// command can gate scripts.
/// # Errors
/// Returns an error if at least one permission is denied.
pub fn can(role: &str, permissions: &[String]) -> Result<()> {
    let explanations = explain(role, permissions);
    println!("{}", serde_json::to_string_pretty(&explanations)?);

    let denied = explanations.iter().filter(|e| !e.granted).count();
    if denied > 0 {
        anyhow::bail!(
            "role `{role}` lacks {denied} of {} requested permission(s)",
            explanations.len()
        );
    }
    Ok(())
}

/// # Errors
/// Returns an error if the table cannot be serialised.
pub fn roles() -> Result<()> {
    let definitions = default_table().definitions();
    println!("{}", serde_json::to_string_pretty(&definitions)?);
    Ok(())
}
