//! Map validated CLI matches to an [`Action`].

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use fieldline_session::Method;
use serde_json::Value;

use crate::cli::actions::Action;
use crate::cli::globals::GlobalArgs;

/// # Errors
/// Returns an error if a subcommand is missing or an argument does not parse.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let globals = GlobalArgs {
        api_url: matches.get_one::<String>("api-url").cloned(),
        credentials_file: matches.get_one::<PathBuf>("credentials-file").cloned(),
    };

    match matches.subcommand() {
        Some(("login", sub)) => Ok(Action::Login {
            globals,
            identifier: required(sub, "identifier")?,
            secret: required(sub, "secret")?,
        }),
        Some(("logout", _)) => Ok(Action::Logout { globals }),
        Some(("request", sub)) => {
            let method = required(sub, "method")?;
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| anyhow!("invalid http method: {method}"))?;
            let data = sub
                .get_one::<String>("data")
                .map(|raw| serde_json::from_str::<Value>(raw))
                .transpose()
                .context("--data must be valid JSON")?;
            Ok(Action::Request {
                globals,
                method,
                path: required(sub, "path")?,
                data,
            })
        }
        Some(("can", sub)) => Ok(Action::Can {
            role: required(sub, "role")?,
            permissions: sub
                .get_many::<String>("permissions")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        }),
        Some(("roles", _)) => Ok(Action::Roles),
        Some((other, _)) => Err(anyhow!("unknown command: {other}")),
        None => Err(anyhow!("missing command")),
    }
}

fn required(matches: &clap::ArgMatches, name: &str) -> Result<String> {
    matches
        .get_one::<String>(name)
        .cloned()
        .with_context(|| format!("missing required argument: {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn action_from(args: &[&str]) -> Result<Action> {
        let matches = commands::new().try_get_matches_from(args.iter().copied())?;
        handler(&matches)
    }

    #[test]
    fn request_parses_method_and_body() {
        let action = action_from(&[
            "fieldline",
            "--api-url",
            "https://api.fieldline.test",
            "request",
            "patch",
            "/jobs/12",
            "--data",
            r#"{"status":"done"}"#,
        ])
        .unwrap();

        match action {
            Action::Request {
                globals,
                method,
                path,
                data,
            } => {
                assert_eq!(globals.api_url.as_deref(), Some("https://api.fieldline.test"));
                assert_eq!(method, Method::PATCH);
                assert_eq!(path, "/jobs/12");
                assert_eq!(data, Some(serde_json::json!({ "status": "done" })));
            }
            other => panic!("expected request action, got {other:?}"),
        }
    }

    #[test]
    fn request_rejects_invalid_json() {
        let err = action_from(&["fieldline", "request", "POST", "/quotes", "--data", "{nope"])
            .unwrap_err();
        assert!(err.to_string().contains("--data"));
    }

    #[test]
    fn can_collects_permissions() {
        let action =
            action_from(&["fieldline", "can", "field", "jobs:read", "jobs:update"]).unwrap();
        match action {
            Action::Can { role, permissions } => {
                assert_eq!(role, "field");
                assert_eq!(permissions, vec!["jobs:read", "jobs:update"]);
            }
            other => panic!("expected can action, got {other:?}"),
        }
    }

    #[test]
    fn login_debug_output_hides_secret() {
        temp_env::with_vars(
            [
                ("FIELDLINE_SECRET", None::<&str>),
                ("FIELDLINE_IDENTIFIER", None::<&str>),
            ],
            || {
                let action = action_from(&[
                    "fieldline",
                    "login",
                    "-i",
                    "tech@acme.test",
                    "--secret",
                    "hunter2",
                ])
                .unwrap();
                let rendered = format!("{action:?}");
                assert!(rendered.contains("tech@acme.test"));
                assert!(!rendered.contains("hunter2"));
            },
        );
    }
}
