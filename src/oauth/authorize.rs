//! Usage: Authorization request (state nonce + PKCE) and authorization URL construction.

use super::pkce::{new_state, PkcePair, CHALLENGE_METHOD};
use super::registration::OAuthClientConfig;
use crate::shared::error::{codes, AppError, AppResult};
use crate::shared::security::constant_time_eq;
use std::process::Command;

/// One per coordinator instance; never persisted.
#[derive(Debug, Clone)]
pub(crate) struct AuthorizationRequest {
    pub(crate) state: String,
    pub(crate) redirect_uri: String,
    pub(crate) scope: String,
    pub(crate) pkce: PkcePair,
}

impl AuthorizationRequest {
    pub(crate) fn new(config: &OAuthClientConfig) -> Self {
        Self {
            state: new_state(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scope(),
            pkce: PkcePair::generate(),
        }
    }

    pub(crate) fn state_matches(&self, candidate: &str) -> bool {
        constant_time_eq(candidate.trim().as_bytes(), self.state.as_bytes())
    }
}

/// Offline access plus forced consent, so the provider always returns a refresh token.
pub(crate) fn build_authorize_url(
    auth_url: &str,
    client_id: &str,
    request: &AuthorizationRequest,
) -> AppResult<String> {
    let mut url = reqwest::Url::parse(auth_url).map_err(|e| {
        AppError::new(
            codes::CONFIG_ERROR,
            format!("invalid oauth auth url {auth_url}: {e}"),
        )
    })?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("response_type", "code");
        query.append_pair("client_id", client_id);
        query.append_pair("redirect_uri", &request.redirect_uri);
        query.append_pair("scope", &request.scope);
        query.append_pair("state", &request.state);
        query.append_pair("code_challenge", &request.pkce.code_challenge);
        query.append_pair("code_challenge_method", CHALLENGE_METHOD);
        query.append_pair("access_type", "offline");
        query.append_pair("prompt", "consent");
    }
    Ok(url.to_string())
}

pub(crate) fn open_browser(url: &str) -> AppResult<()> {
    #[cfg(target_os = "windows")]
    {
        let mut cmd = Command::new("rundll32.exe");
        cmd.arg("url.dll,FileProtocolHandler").arg(url);
        cmd.spawn()
            .map_err(|e| format!("SYSTEM_ERROR: failed to open browser: {e}"))?;
        return Ok(());
    }

    #[cfg(target_os = "macos")]
    {
        Command::new("open")
            .arg(url)
            .spawn()
            .map_err(|e| format!("SYSTEM_ERROR: failed to open browser: {e}"))?;
        return Ok(());
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        Command::new("xdg-open")
            .arg(url)
            .spawn()
            .map_err(|e| format!("SYSTEM_ERROR: failed to open browser: {e}"))?;
        return Ok(());
    }

    #[allow(unreachable_code)]
    Err("SYSTEM_ERROR: browser open is unsupported on this platform"
        .to_string()
        .into())
}
