use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::listen::{self, ListenAddress};
use super::routes::{build_router, validate_callback_path};
use crate::oauth::OAuthCoordinator;
use crate::shared::error::{codes, AppError, AppResult};

/// Default grace period for in-flight requests on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(60);

/// The callback HTTP server, bound but not yet serving.
pub struct CallbackServer {
    listener: std::net::TcpListener,
    bind_addr: SocketAddr,
    coordinator: Arc<OAuthCoordinator>,
    callback_path: String,
}

/// A serving callback server. Dropping it without [`RunningServer::stop`]
/// leaves the serve task detached.
pub struct RunningServer {
    bind_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
    errors: mpsc::Receiver<AppError>,
}

fn bind_host_port(addr: &ListenAddress) -> AppResult<std::net::TcpListener> {
    let listener = std::net::TcpListener::bind((addr.host.as_str(), addr.port)).map_err(|e| {
        AppError::with_source(
            codes::IO_ERROR,
            format!("failed to bind {}", addr.display()),
            e,
        )
    })?;
    listener.set_nonblocking(true).map_err(|e| {
        AppError::with_source(codes::IO_ERROR, "failed to set listener non-blocking", e)
    })?;
    Ok(listener)
}

impl CallbackServer {
    pub fn bind(
        addr: &ListenAddress,
        coordinator: Arc<OAuthCoordinator>,
        callback_path: impl Into<String>,
    ) -> AppResult<Self> {
        let callback_path = callback_path.into();
        validate_callback_path(&callback_path)?;
        let listener = bind_host_port(addr)?;
        let bind_addr = listener.local_addr().map_err(|e| {
            AppError::with_source(codes::IO_ERROR, "failed to read bound address", e)
        })?;
        Ok(Self {
            listener,
            bind_addr,
            coordinator,
            callback_path,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Spawns the serve loop. Serve failures are reported through
    /// [`RunningServer::failed`] rather than aborting the process.
    pub fn start(self) -> RunningServer {
        let app = build_router(self.coordinator, &self.callback_path);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (error_tx, error_rx) = mpsc::channel::<AppError>(1);
        let bind_addr = self.bind_addr;
        let std_listener = self.listener;

        let task = tokio::spawn(async move {
            let listener = match tokio::net::TcpListener::from_std(std_listener) {
                Ok(l) => l,
                Err(err) => {
                    tracing::error!(bind_addr = %bind_addr, "callback listener init failed: {}", err);
                    let _ = error_tx
                        .send(AppError::with_source(codes::IO_ERROR, "callback listener init failed", err))
                        .await;
                    return;
                }
            };

            tracing::info!(
                bind_addr = %listen::format_host_port(&bind_addr.ip().to_string(), bind_addr.port()),
                "callback server listening"
            );
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });

            if let Err(err) = serve.await {
                tracing::error!(bind_addr = %bind_addr, "callback server error: {}", err);
                let _ = error_tx
                    .send(AppError::with_source(codes::IO_ERROR, "callback server error", err))
                    .await;
            }
        });

        RunningServer {
            bind_addr,
            shutdown: shutdown_tx,
            task,
            errors: error_rx,
        }
    }
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Resolves when the serve loop fails. Pending forever while healthy.
    pub async fn failed(&mut self) -> AppError {
        match self.errors.recv().await {
            Some(err) => err,
            None => std::future::pending().await,
        }
    }

    /// Stops accepting connections and waits up to `grace` for in-flight
    /// requests before aborting the serve task.
    pub async fn stop(self, grace: Duration) {
        tracing::info!("shutting down callback server");
        let _ = self.shutdown.send(());
        let mut task = self.task;
        match tokio::time::timeout(grace, &mut task).await {
            Ok(_) => tracing::info!("callback server stopped"),
            Err(_) => {
                tracing::warn!(grace_secs = grace.as_secs(), "graceful shutdown timed out; aborting");
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::{ClientRegistration, MemoryCredentialStore, OAuthClientConfig};

    fn coordinator() -> Arc<OAuthCoordinator> {
        let config = OAuthClientConfig {
            registration: ClientRegistration {
                client_id: "client-1".to_string(),
                client_secret: None,
                auth_url: "https://accounts.example.com/auth".to_string(),
                token_url: "http://127.0.0.1:9/token".to_string(),
                redirect_uris: vec![],
            },
            redirect_uri: "http://localhost/oauth2/callback".to_string(),
            scopes: vec!["scope-a".to_string()],
        };
        Arc::new(
            OAuthCoordinator::new(config, Arc::new(MemoryCredentialStore::new()), reqwest::Client::new())
                .expect("coordinator"),
        )
    }

    fn ephemeral() -> ListenAddress {
        ListenAddress {
            host: "127.0.0.1".to_string(),
            port: 0,
        }
    }

    #[tokio::test]
    async fn serves_health_and_stops() {
        let server = CallbackServer::bind(&ephemeral(), coordinator(), "/oauth2/callback").expect("bind");
        let addr = server.local_addr();
        assert_ne!(addr.port(), 0);
        let running = server.start();

        let response = reqwest::get(format!("http://{addr}/health")).await.expect("health");
        assert!(response.status().is_success());

        running.stop(Duration::from_secs(5)).await;
        assert!(reqwest::get(format!("http://{addr}/health")).await.is_err());
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let first = CallbackServer::bind(&ephemeral(), coordinator(), "/cb").expect("bind");
        let taken = ListenAddress {
            host: "127.0.0.1".to_string(),
            port: first.local_addr().port(),
        };
        let err = CallbackServer::bind(&taken, coordinator(), "/cb").err().expect("conflict");
        assert!(err.is(codes::IO_ERROR));
    }

    #[test]
    fn reserved_callback_path_is_rejected_before_binding() {
        for path in ["/", "/health", "/cb/:id"] {
            let err = CallbackServer::bind(&ephemeral(), coordinator(), path)
                .err()
                .expect("invalid path");
            assert!(err.is(codes::CONFIG_ERROR), "{path}");
        }
    }
}
