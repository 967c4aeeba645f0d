//! Usage: Authorization flow coordinator. Owns the authorization request, the
//! pending-authorization slot and the credential store; hands out authenticated
//! transports.

use super::authorize::{build_authorize_url, open_browser, AuthorizationRequest};
use super::credential::Credential;
use super::refresh::{SavingTokenSource, TokenRefresher};
use super::registration::OAuthClientConfig;
use super::signal::PendingAuthorization;
use super::store::CredentialStore;
use super::token_exchange::TokenEndpoint;
use super::transport::AuthenticatedTransport;
use crate::shared::blocking;
use crate::shared::error::{codes, AppError, AppResult};
use crate::shared::security::mask_token;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub struct OAuthCoordinator {
    config: OAuthClientConfig,
    request: AuthorizationRequest,
    auth_url: String,
    endpoint: TokenEndpoint,
    refresher: Arc<dyn TokenRefresher>,
    store: Arc<dyn CredentialStore>,
    http: reqwest::Client,
    pending: PendingAuthorization,
    auth_timeout: Duration,
    open_browser: bool,
}

impl std::fmt::Debug for OAuthCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCoordinator")
            .field("client_id", &self.config.registration.client_id)
            .field("redirect_uri", &self.config.redirect_uri)
            .field("auth_timeout", &self.auth_timeout)
            .finish_non_exhaustive()
    }
}

impl OAuthCoordinator {
    pub fn new(
        config: OAuthClientConfig,
        store: Arc<dyn CredentialStore>,
        http: reqwest::Client,
    ) -> AppResult<Self> {
        let request = AuthorizationRequest::new(&config);
        let auth_url = build_authorize_url(
            &config.registration.auth_url,
            &config.registration.client_id,
            &request,
        )?;
        let endpoint = TokenEndpoint::new(http.clone(), config.registration.clone());

        Ok(Self {
            refresher: Arc::new(endpoint.clone()),
            config,
            request,
            auth_url,
            endpoint,
            store,
            http,
            pending: PendingAuthorization::new(),
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            open_browser: false,
        })
    }

    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    pub fn with_open_browser(mut self, enabled: bool) -> Self {
        self.open_browser = enabled;
        self
    }

    /// Replaces the token-endpoint refresh used by issued transports.
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = refresher;
        self
    }

    /// Stable for the lifetime of this coordinator.
    pub fn authorization_url(&self) -> &str {
        &self.auth_url
    }

    pub fn state(&self) -> &str {
        &self.request.state
    }

    pub fn redirect_uri(&self) -> &str {
        &self.request.redirect_uri
    }

    pub fn auth_timeout(&self) -> Duration {
        self.auth_timeout
    }

    pub(crate) fn state_matches(&self, candidate: &str) -> bool {
        self.request.state_matches(candidate)
    }

    /// Returns a transport backed by the stored credential, or runs the
    /// browser authorization flow when none is usable. No retry on timeout.
    pub async fn get_client(&self) -> AppResult<AuthenticatedTransport> {
        let credential = match self.load_stored().await {
            Ok(credential) if credential.is_usable(Utc::now()) => {
                tracing::info!("using existing credential from store");
                credential
            }
            Ok(_) => {
                tracing::info!("stored credential expired without refresh token; starting oauth flow");
                self.authorize_interactively().await?
            }
            Err(err) => {
                tracing::info!("no valid credential found, starting oauth flow: {}", err);
                self.authorize_interactively().await?
            }
        };

        Ok(self.transport_for(credential))
    }

    pub fn transport_for(&self, credential: Credential) -> AuthenticatedTransport {
        let tokens = SavingTokenSource::new(credential, self.refresher.clone(), self.store.clone());
        AuthenticatedTransport::new(self.http.clone(), Arc::new(tokens))
    }

    async fn authorize_interactively(&self) -> AppResult<Credential> {
        tracing::info!(auth_url = %self.auth_url, "authorization required");
        println!(
            "Open this link in your browser to authorize:\n{}",
            self.auth_url
        );
        println!("Waiting for authorization...");

        if self.open_browser {
            if let Err(err) = open_browser(&self.auth_url) {
                tracing::warn!("failed to open browser: {}", err);
            }
        }

        let credential = self.wait_for_authorization(self.auth_timeout).await?;
        tracing::info!("authorization successful");
        if credential.has_refresh_token() {
            tracing::info!("refresh token received and will be saved");
        } else {
            tracing::warn!(
                "no refresh token received; reauthorization will be needed when the access token expires"
            );
        }

        self.persist(&credential).await?;
        Ok(credential)
    }

    /// Suspends until the callback delivers a credential or `timeout` elapses
    /// (`AUTH_TIMEOUT`).
    pub async fn wait_for_authorization(&self, timeout: Duration) -> AppResult<Credential> {
        self.pending.wait(timeout).await
    }

    /// Exchanges an authorization code at the provider token endpoint.
    pub async fn exchange_code(&self, code: &str) -> AppResult<Credential> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::new(
                codes::EXCHANGE_ERROR,
                "authorization code is empty",
            ));
        }
        self.endpoint
            .exchange_authorization_code(
                code,
                &self.request.redirect_uri,
                &self.request.pkce.code_verifier,
            )
            .await
    }

    /// Persists, then offers the credential to a waiting flow. The offer is
    /// causally after the save, so a woken waiter always finds it on disk.
    /// Returns whether the waiting slot accepted it.
    pub async fn deliver(&self, credential: Credential) -> AppResult<bool> {
        self.persist(&credential).await?;
        let accepted = self.pending.offer(credential);
        if accepted {
            tracing::info!("credential handed to authorization flow");
        }
        Ok(accepted)
    }

    async fn load_stored(&self) -> AppResult<Credential> {
        let store = self.store.clone();
        blocking::run("load_credential", move || store.load()).await
    }

    async fn persist(&self, credential: &Credential) -> AppResult<()> {
        tracing::debug!(
            access_token = %mask_token(&credential.access_token),
            "persisting credential"
        );
        let store = self.store.clone();
        let credential = credential.clone();
        blocking::run("save_credential", move || {
            store.save(&credential);
            Ok::<_, AppError>(())
        })
        .await
    }
}
