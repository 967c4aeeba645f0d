//! Usage: Client registration (client id/secret + provider endpoints) loaded from
//! the provider's `credentials.json` document.

use crate::shared::error::{codes, AppError, AppResult};
use serde::Deserialize;
use std::path::Path;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Full mailbox access, required for watch/stop.
pub const GMAIL_FULL_SCOPE: &str = "https://mail.google.com/";

/// Static OAuth client configuration for the mailbox provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RegistrationDocument {
    installed: Option<RegistrationSection>,
    web: Option<RegistrationSection>,
}

#[derive(Debug, Deserialize)]
struct RegistrationSection {
    client_id: String,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    auth_uri: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl ClientRegistration {
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read(path).map_err(|e| {
            AppError::new(
                codes::CONFIG_ERROR,
                format!("failed to read credentials file {}: {e}", path.display()),
            )
        })?;
        Self::from_json(&content)
    }

    /// Accepts the `{"installed": {..}}` and `{"web": {..}}` layouts.
    pub fn from_json(bytes: &[u8]) -> AppResult<Self> {
        let doc: RegistrationDocument = serde_json::from_slice(bytes).map_err(|e| {
            AppError::new(
                codes::CONFIG_ERROR,
                format!("failed to parse credentials: {e}"),
            )
        })?;
        let section = doc.web.or(doc.installed).ok_or_else(|| {
            AppError::new(
                codes::CONFIG_ERROR,
                "credentials must contain an \"installed\" or \"web\" section",
            )
        })?;

        let client_id = section.client_id.trim().to_string();
        if client_id.is_empty() {
            return Err(AppError::new(
                codes::CONFIG_ERROR,
                "credentials client_id is empty",
            ));
        }

        Ok(Self {
            client_id,
            client_secret: non_empty(section.client_secret),
            auth_url: non_empty(section.auth_uri).unwrap_or_else(|| GOOGLE_AUTH_URL.to_string()),
            token_url: non_empty(section.token_uri)
                .unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string()),
            redirect_uris: section
                .redirect_uris
                .into_iter()
                .filter_map(|uri| non_empty(Some(uri)))
                .collect(),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Helper to construct a redirect URI from the callback listener address.
pub fn make_redirect_uri(host: &str, port: u16, callback_path: &str) -> String {
    let host = match host.trim() {
        "" | "0.0.0.0" | "::" => "localhost",
        h => h,
    };
    let host = if host.contains(':') {
        format!("[{host}]")
    } else {
        host.to_string()
    };
    format!("http://{host}:{port}{callback_path}")
}

/// Everything the authorization flow needs to talk to the provider.
#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub registration: ClientRegistration,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthClientConfig {
    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }
}
