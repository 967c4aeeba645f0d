use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::oauth::callback_server::oauth_callback;
use crate::oauth::OAuthCoordinator;
use crate::shared::error::{codes, AppError, AppResult};

const ROOT_PATH: &str = "/";
const HEALTH_PATH: &str = "/health";

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    app: &'static str,
    version: &'static str,
    ts: i64,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        ts: chrono::Utc::now().timestamp(),
    })
}

async fn root() -> &'static str {
    "inbox-auth is running"
}

/// Callback paths must be literal and must not shadow the built-in routes.
pub fn validate_callback_path(path: &str) -> AppResult<()> {
    let invalid = |reason: &str| {
        Err(AppError::new(
            codes::CONFIG_ERROR,
            format!("invalid callback_path {path:?}: {reason}"),
        ))
    };
    if !path.starts_with('/') {
        return invalid("must start with '/'");
    }
    if path == ROOT_PATH || path == HEALTH_PATH {
        return invalid("reserved route");
    }
    if path.ends_with('/') || path.contains("//") {
        return invalid("empty path segment");
    }
    if path.chars().any(|c| matches!(c, ':' | '*' | '?' | '#') || c.is_whitespace()) {
        return invalid("must be a literal path");
    }
    Ok(())
}

pub(crate) fn build_router(coordinator: Arc<OAuthCoordinator>, callback_path: &str) -> Router {
    Router::new()
        .route(ROOT_PATH, get(root))
        .route(HEALTH_PATH, get(health))
        .route(callback_path, get(oauth_callback))
        .with_state(coordinator)
}
