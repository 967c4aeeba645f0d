//! Usage: OAuth redirect endpoint. Exchanges the authorization code, persists the
//! credential and hands it to the waiting authorization flow.

use super::coordinator::OAuthCoordinator;
use crate::shared::error::{codes, AppError};
use crate::shared::security::escape_html;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

const SUCCESS_HTML: &str = "<html><head><title>Authorization Complete</title></head><body><h1>Authorization Successful!</h1><p>You can close this window and return to the application.</p></body></html>";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct OAuthCallbackPayload {
    pub(crate) code: Option<String>,
    pub(crate) state: Option<String>,
    pub(crate) error: Option<String>,
    pub(crate) error_description: Option<String>,
}

impl OAuthCallbackPayload {
    fn code(&self) -> Option<&str> {
        self.code.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

fn error_page(message: &str) -> Response {
    let body = format!(
        "<html><head><title>Authorization Failed</title></head><body><h1>Authorization Failed</h1><p>{}</p><p>You may close this window and retry.</p></body></html>",
        escape_html(message)
    );
    (StatusCode::BAD_REQUEST, Html(body)).into_response()
}

pub(crate) async fn oauth_callback(
    State(coordinator): State<Arc<OAuthCoordinator>>,
    Query(payload): Query<OAuthCallbackPayload>,
) -> Response {
    tracing::info!(
        has_code = payload.code().is_some(),
        has_state = payload.state.is_some(),
        "oauth callback received"
    );

    if let Some(err_code) = payload.error.as_deref() {
        let description = payload
            .error_description
            .as_deref()
            .unwrap_or("oauth login failed");
        tracing::warn!(error = err_code, "provider returned authorization error: {}", description);
        return error_page(&format!("Provider returned error={err_code}: {description}"));
    }

    let Some(code) = payload.code() else {
        tracing::warn!("missing authorization code in callback");
        return error_page("Missing authorization code");
    };

    if let Some(state) = payload.state.as_deref() {
        if !coordinator.state_matches(state) {
            let err = AppError::new(codes::SEC_INVALID_INPUT, "oauth callback state mismatch");
            tracing::warn!("{}", err);
            return error_page("Invalid authorization state");
        }
    }

    tracing::info!("received authorization code, exchanging for token");
    let credential = match coordinator.exchange_code(code).await {
        Ok(credential) => credential,
        Err(err) => {
            tracing::warn!("token exchange failed: {}", err);
            return error_page(&format!("Token exchange failed: {}", err.message()));
        }
    };

    match coordinator.deliver(credential).await {
        Ok(true) => {}
        Ok(false) => tracing::info!("no authorization flow waiting; credential saved only"),
        Err(err) => tracing::warn!("credential delivery failed: {}", err),
    }

    (StatusCode::OK, Html(SUCCESS_HTML)).into_response()
}
