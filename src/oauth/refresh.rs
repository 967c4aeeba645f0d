//! Usage: Token source that refreshes expiring credentials and persists every
//! refresh before the outbound request proceeds.

use super::credential::Credential;
use super::store::CredentialStore;
use super::token_exchange::TokenEndpoint;
use crate::shared::blocking;
use crate::shared::error::{codes, AppError, AppResult};
use crate::shared::security::mask_token;
use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type RefreshFuture<'a> = Pin<Box<dyn Future<Output = AppResult<Credential>> + Send + 'a>>;

/// The provider-side refresh mechanism.
///
/// Object-safe so the transport can hold `Arc<dyn TokenRefresher>`.
pub trait TokenRefresher: Send + Sync {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> RefreshFuture<'a>;
}

impl TokenRefresher for TokenEndpoint {
    fn refresh<'a>(&'a self, refresh_token: &'a str) -> RefreshFuture<'a> {
        Box::pin(self.refresh_access_token(refresh_token))
    }
}

pub struct SavingTokenSource {
    current: Mutex<Credential>,
    refresher: Arc<dyn TokenRefresher>,
    store: Arc<dyn CredentialStore>,
}

impl std::fmt::Debug for SavingTokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SavingTokenSource").finish_non_exhaustive()
    }
}

impl SavingTokenSource {
    pub fn new(
        credential: Credential,
        refresher: Arc<dyn TokenRefresher>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            current: Mutex::new(credential),
            refresher,
            store,
        }
    }

    /// Snapshot of the in-memory credential, without refreshing.
    pub async fn current(&self) -> Credential {
        self.current.lock().await.clone()
    }

    /// Returns a credential valid for the next request. Refreshes are serialized:
    /// callers arriving during a refresh wait for it and reuse its result.
    pub async fn token(&self) -> AppResult<Credential> {
        let mut current = self.current.lock().await;
        if !current.needs_refresh(Utc::now()) {
            return Ok(current.clone());
        }

        let refresh_token = current.refresh_token().map(str::to_string).ok_or_else(|| {
            AppError::new(
                codes::AUTH_RELOGIN_REQUIRED,
                "access token expired and no refresh token is stored; reauthorize",
            )
        })?;

        tracing::info!(
            refresh_token = %mask_token(&refresh_token),
            "access token expired; refreshing"
        );
        let mut refreshed = self.refresher.refresh(&refresh_token).await?;
        if !refreshed.has_refresh_token() {
            refreshed.refresh_token = Some(refresh_token);
        }

        let store = self.store.clone();
        let to_save = refreshed.clone();
        blocking::run("persist_refreshed_credential", move || {
            store.save(&to_save);
            Ok::<_, AppError>(())
        })
        .await?;

        *current = refreshed.clone();
        Ok(refreshed)
    }
}
