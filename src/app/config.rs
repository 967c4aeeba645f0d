//! Usage: Process configuration (JSON settings file + environment overrides).

use crate::mailbox::{DEFAULT_BASE_URL, DEFAULT_MAX_RESULTS, DEFAULT_USER};
use crate::oauth::registration::{make_redirect_uri, GMAIL_FULL_SCOPE};
use crate::server::{parse_listen_address, validate_callback_path, ListenAddress};
use crate::shared::error::{codes, AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "inbox-auth.json";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
pub const DEFAULT_CALLBACK_PATH: &str = "/oauth2/callback";
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
pub const DEFAULT_TOKEN_FILE: &str = "token.json";
const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 5 * 60;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 60;
const DEFAULT_LOG_LEVEL: &str = "info";
const MAX_AUTH_TIMEOUT_SECS: u64 = 24 * 60 * 60;
const MAX_MAX_RESULTS: u32 = 500;

pub const ENV_CONFIG: &str = "INBOX_AUTH_CONFIG";
const ENV_LISTEN: &str = "INBOX_AUTH_LISTEN";
const ENV_CREDENTIALS_FILE: &str = "INBOX_AUTH_CREDENTIALS_FILE";
const ENV_TOKEN_FILE: &str = "INBOX_AUTH_TOKEN_FILE";
const ENV_AUTH_TIMEOUT_SECS: &str = "INBOX_AUTH_AUTH_TIMEOUT_SECS";
const ENV_WATCH_TOPIC: &str = "INBOX_AUTH_WATCH_TOPIC";
const ENV_LOG_DIR: &str = "INBOX_AUTH_LOG_DIR";
const ENV_OPEN_BROWSER: &str = "INBOX_AUTH_OPEN_BROWSER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen: String,
    pub callback_path: String,
    /// Overrides the redirect URI derived from `listen` + `callback_path`.
    pub redirect_uri: Option<String>,
    pub credentials_file: PathBuf,
    pub token_file: PathBuf,
    pub scopes: Vec<String>,
    pub auth_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
    pub mailbox_user: String,
    pub mailbox_base_url: String,
    pub max_results: u32,
    pub watch_topic: Option<String>,
    pub open_browser: bool,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            redirect_uri: None,
            credentials_file: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            scopes: vec![GMAIL_FULL_SCOPE.to_string()],
            auth_timeout_secs: DEFAULT_AUTH_TIMEOUT_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
            mailbox_user: DEFAULT_USER.to_string(),
            mailbox_base_url: DEFAULT_BASE_URL.to_string(),
            max_results: DEFAULT_MAX_RESULTS,
            watch_topic: None,
            open_browser: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_dir: None,
        }
    }
}

fn config_error(message: impl Into<String>) -> AppError {
    AppError::new(codes::CONFIG_ERROR, message)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(config_error(format!("{key} must be a boolean, got {other:?}"))),
    }
}

impl AppConfig {
    /// Settings file (when present), then process environment, then validation.
    pub fn load() -> AppResult<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    pub fn load_with(env: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let explicit = non_empty(env(ENV_CONFIG));
        let path = explicit
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else if explicit.is_some() {
            return Err(config_error(format!(
                "settings file not found: {}",
                path.display()
            )));
        } else {
            Self::default()
        };

        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::with_source(
                codes::CONFIG_ERROR,
                format!("failed to read settings file {}", path.display()),
                e,
            )
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            AppError::with_source(
                codes::CONFIG_ERROR,
                format!("invalid settings file {}", path.display()),
                e,
            )
        })
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> AppResult<()> {
        if let Some(v) = non_empty(env(ENV_LISTEN)) {
            self.listen = v;
        }
        if let Some(v) = non_empty(env(ENV_CREDENTIALS_FILE)) {
            self.credentials_file = PathBuf::from(v);
        }
        if let Some(v) = non_empty(env(ENV_TOKEN_FILE)) {
            self.token_file = PathBuf::from(v);
        }
        if let Some(v) = non_empty(env(ENV_AUTH_TIMEOUT_SECS)) {
            self.auth_timeout_secs = v.parse().map_err(|_| {
                config_error(format!("{ENV_AUTH_TIMEOUT_SECS} must be a number of seconds"))
            })?;
        }
        if let Some(v) = non_empty(env(ENV_WATCH_TOPIC)) {
            self.watch_topic = Some(v);
        }
        if let Some(v) = non_empty(env(ENV_LOG_DIR)) {
            self.log_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty(env(ENV_OPEN_BROWSER)) {
            self.open_browser = parse_bool(ENV_OPEN_BROWSER, &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        parse_listen_address(&self.listen)?;
        validate_callback_path(&self.callback_path)?;
        if self.scopes.iter().all(|s| s.trim().is_empty()) {
            return Err(config_error("at least one scope is required"));
        }
        if self.auth_timeout_secs == 0 || self.auth_timeout_secs > MAX_AUTH_TIMEOUT_SECS {
            return Err(config_error(format!(
                "auth_timeout_secs must be within 1..={MAX_AUTH_TIMEOUT_SECS}"
            )));
        }
        if self.max_results == 0 || self.max_results > MAX_MAX_RESULTS {
            return Err(config_error(format!(
                "max_results must be within 1..={MAX_MAX_RESULTS}"
            )));
        }
        if self.mailbox_user.trim().is_empty() {
            return Err(config_error("mailbox_user must not be empty"));
        }
        if !self.mailbox_base_url.starts_with("http://") && !self.mailbox_base_url.starts_with("https://") {
            return Err(config_error("mailbox_base_url must be an http(s) URL"));
        }
        Ok(())
    }

    pub fn listen_address(&self) -> AppResult<ListenAddress> {
        parse_listen_address(&self.listen)
    }

    /// Explicit override, else derived from the configured listen address.
    pub fn effective_redirect_uri(&self) -> AppResult<String> {
        if let Some(uri) = non_empty(self.redirect_uri.clone()) {
            return Ok(uri);
        }
        let addr = self.listen_address()?;
        Ok(make_redirect_uri(&addr.host, addr.port, &self.callback_path))
    }

    pub fn scopes(&self) -> Vec<String> {
        self.scopes
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
