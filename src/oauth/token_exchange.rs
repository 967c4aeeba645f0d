//! Usage: OAuth token endpoint client (authorization_code + refresh_token grants).

use super::credential::{Credential, DEFAULT_TOKEN_TYPE};
use super::registration::ClientRegistration;
use crate::shared::error::{codes, AppError, AppResult};
use crate::shared::security::{mask_token, sanitize_error_body};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    client: reqwest::Client,
    registration: ClientRegistration,
}

impl TokenEndpoint {
    pub fn new(client: reqwest::Client, registration: ClientRegistration) -> Self {
        Self {
            client,
            registration,
        }
    }

    fn base_form(&self, grant_type: &str) -> HashMap<&'static str, String> {
        let mut form: HashMap<&'static str, String> = HashMap::new();
        form.insert("grant_type", grant_type.to_string());
        form.insert("client_id", self.registration.client_id.trim().to_string());
        if let Some(secret) = self.registration.client_secret.as_deref().map(str::trim) {
            if !secret.is_empty() {
                form.insert("client_secret", secret.to_string());
            }
        }
        form
    }

    /// Failures surface as `EXCHANGE_ERROR`.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> AppResult<Credential> {
        let mut form = self.base_form("authorization_code");
        form.insert("code", code.trim().to_string());
        form.insert("redirect_uri", redirect_uri.trim().to_string());
        form.insert("code_verifier", code_verifier.trim().to_string());

        let response = self
            .client
            .post(self.registration.token_url.trim())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                AppError::new(
                    codes::EXCHANGE_ERROR,
                    format!("oauth token exchange request failed: {e}"),
                )
            })?;

        parse_token_response(response, codes::EXCHANGE_ERROR).await
    }

    /// Failures surface as `AUTH_RELOGIN_REQUIRED` when the grant itself was
    /// rejected, `TRANSPORT_ERROR` otherwise.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> AppResult<Credential> {
        let mut form = self.base_form("refresh_token");
        form.insert("refresh_token", refresh_token.trim().to_string());

        let response = self
            .client
            .post(self.registration.token_url.trim())
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                AppError::new(
                    codes::TRANSPORT_ERROR,
                    format!("oauth refresh request failed: {e}"),
                )
            })?;

        parse_token_response(response, codes::TRANSPORT_ERROR).await
    }
}

async fn parse_token_response(
    response: reqwest::Response,
    failure_code: &'static str,
) -> AppResult<Credential> {
    let status = response.status();
    let body = response.text().await.map_err(|e| {
        AppError::new(
            failure_code,
            format!("oauth token response read failed: {e}"),
        )
    })?;

    if !status.is_success() {
        let (error_code, error_message) = parse_oauth_error_details(&body);
        let snippet = sanitize_error_body(&body);
        tracing::warn!(
            status = status.as_u16(),
            error_code = error_code.as_deref().unwrap_or(""),
            body = %snippet,
            "oauth token endpoint rejected request"
        );

        let code = if failure_code == codes::TRANSPORT_ERROR
            && error_code.as_deref() == Some("invalid_grant")
        {
            codes::AUTH_RELOGIN_REQUIRED
        } else {
            failure_code
        };
        let mut msg = format!("oauth token endpoint returned status={}", status.as_u16());
        if let Some(code) = error_code {
            msg.push_str(" error=");
            msg.push_str(code.as_str());
        }
        if let Some(detail) = error_message {
            msg.push_str(" message=");
            msg.push_str(detail.chars().take(240).collect::<String>().as_str());
        }
        return Err(AppError::new(code, msg));
    }

    let value: Value = serde_json::from_str(&body).map_err(|e| {
        AppError::new(
            failure_code,
            format!("oauth token response json invalid: {e}"),
        )
    })?;

    let access_token = string_field(&value, "access_token").ok_or_else(|| {
        AppError::new(failure_code, "oauth token response missing access_token")
    })?;
    let refresh_token = string_field(&value, "refresh_token");
    let token_type =
        string_field(&value, "token_type").unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());
    let expiry = value
        .get("expires_in")
        .and_then(parse_i64_lossy)
        .and_then(|v| expiry_after(Utc::now(), v));

    tracing::debug!(
        access_token = %mask_token(&access_token),
        has_refresh_token = refresh_token.is_some(),
        "oauth token endpoint issued credential"
    );

    Ok(Credential {
        access_token,
        token_type,
        refresh_token,
        expiry,
    })
}

/// Out-of-range lifetimes are treated as an unknown expiry.
fn expiry_after(now: DateTime<Utc>, expires_in: i64) -> Option<DateTime<Utc>> {
    if expires_in <= 0 {
        return None;
    }
    now.checked_add_signed(Duration::try_seconds(expires_in)?)
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_i64_lossy(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn parse_oauth_error_details(body: &str) -> (Option<String>, Option<String>) {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return (None, None),
    };

    let mut code = None;
    let mut message = string_field(&value, "error_description");

    if let Some(error_value) = value.get("error") {
        if let Some(err_str) = error_value.as_str() {
            code = Some(err_str.trim().to_string());
        } else if let Some(err_obj) = error_value.as_object() {
            code = err_obj
                .get("status")
                .or_else(|| err_obj.get("code"))
                .and_then(|v| match v {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|v| !v.is_empty());
            if message.is_none() {
                message = err_obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
            }
        }
    }

    (code, message)
}
