use anyhow::{Context, Result};
use fieldline_session::{ApiRequest, ApiResponse, AuthError, ClientError, Method, SessionState};
use serde_json::Value;
use tracing::debug;

use crate::cli::globals::GlobalArgs;

/// # Errors
/// Returns an error if the server rejects the credentials or cannot be reached.
pub async fn login(globals: &GlobalArgs, identifier: &str, secret: &str) -> Result<()> {
    let session = globals.session()?;

    match session.login(identifier, secret).await {
        Ok(_) => {
            println!("Signed in as {identifier}.");
            Ok(())
        }
        Err(AuthError::InvalidCredentials) => {
            anyhow::bail!("invalid identifier or secret")
        }
        Err(err) => Err(err).context("login failed"),
    }
}

/// # Errors
/// Returns an error only if the session cannot be constructed; the remote
/// call itself is best-effort.
pub async fn logout(globals: &GlobalArgs) -> Result<()> {
    let session = globals.session()?;
    let was_signed_in = session.state() != SessionState::Anonymous;
    session.logout().await;
    if was_signed_in {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
    Ok(())
}

/// # Errors
/// Returns an error if the request fails or the session has expired.
pub async fn request(
    globals: &GlobalArgs,
    method: Method,
    path: &str,
    data: Option<Value>,
) -> Result<()> {
    let client = globals.client()?;

    let mut request = ApiRequest::new(method, path);
    if let Some(body) = data {
        request = request.json(body);
    }

    let signed_in = client.session().state() != SessionState::Anonymous;

    debug!(path, "sending request");
    let response = match client.send(request).await {
        Err(ClientError::SessionExpired) if !signed_in => {
            anyhow::bail!("not signed in; run `fieldline login` first")
        }
        other => other?,
    };
    if let Some(rendered) = render(&response)? {
        println!("{rendered}");
    }
    Ok(())
}

/// Printable form of a response; `None` for an empty body.
pub fn render(response: &ApiResponse) -> Result<Option<String>> {
    Ok(match response {
        ApiResponse::Empty => None,
        ApiResponse::Json(value) => Some(serde_json::to_string_pretty(value)?),
        ApiResponse::Text(text) => Some(text.clone()),
    })
}
