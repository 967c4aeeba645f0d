//! Usage: Process run loop: callback server, background authorization + mailbox
//! calls, and signal-driven graceful shutdown.

use super::config::AppConfig;
use crate::mailbox::{MailboxClient, INBOX_LABEL};
use crate::oauth::{ClientRegistration, FileCredentialStore, OAuthClientConfig, OAuthCoordinator};
use crate::server::{CallbackServer, RunningServer};
use crate::shared::error::{codes, AppError, AppResult};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub fn build_http_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!("inbox-auth/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::with_source(codes::SYSTEM_ERROR, "failed to build http client", e))
}

pub fn build_coordinator(config: &AppConfig, http: reqwest::Client) -> AppResult<OAuthCoordinator> {
    let registration = ClientRegistration::from_file(&config.credentials_file)?;
    let oauth = OAuthClientConfig {
        registration,
        redirect_uri: config.effective_redirect_uri()?,
        scopes: config.scopes(),
    };
    let store = Arc::new(FileCredentialStore::new(&config.token_file));
    Ok(OAuthCoordinator::new(oauth, store, http)?
        .with_auth_timeout(config.auth_timeout())
        .with_open_browser(config.open_browser))
}

/// Authorizes (stored credential or browser flow), then runs the mailbox calls once.
pub async fn run_mailbox_flow(coordinator: Arc<OAuthCoordinator>, config: AppConfig) -> AppResult<()> {
    tracing::info!("starting oauth flow");
    let transport = coordinator.get_client().await?;
    let mailbox = MailboxClient::with_base_url(transport, &config.mailbox_base_url, &config.mailbox_user);

    let recent = mailbox.list_recent(config.max_results).await?;
    if recent.is_empty() {
        println!("No emails found.");
    } else {
        println!("Found {} recent emails:", recent.len());
        for (idx, summary) in recent.iter().enumerate() {
            println!("   {}. {} (ID: {})", idx + 1, summary.subject, summary.id);
        }
    }

    match mailbox.list_labels().await {
        Ok(labels) if labels.is_empty() => println!("No labels found."),
        Ok(labels) => {
            println!("Found {} labels:", labels.len());
            for label in &labels {
                println!("   - {}", label.name);
            }
        }
        Err(err) => tracing::warn!("failed to list labels: {}", err),
    }

    if let Some(topic) = config.watch_topic.as_deref() {
        let watch = mailbox.start_watch(topic, &[INBOX_LABEL]).await?;
        println!(
            "Watch started: history_id={} expiration={}",
            watch.history_id,
            watch.expiration.as_deref().unwrap_or("-")
        );
    }

    tracing::info!("mailbox operations completed successfully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for ctrl-c: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::warn!("failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

enum Event {
    ServerFailed(AppError),
    Shutdown,
    FlowFinished(AppResult<()>),
}

fn flatten_join(joined: Result<AppResult<()>, tokio::task::JoinError>) -> AppResult<()> {
    joined.map_err(|e| AppError::new(codes::TASK_JOIN, format!("mailbox flow task failed: {e}")))?
}

/// Runs until a shutdown signal, a server failure, or a failed authorization flow.
/// A successful flow leaves the server running.
pub async fn run(config: AppConfig) -> AppResult<()> {
    let http = build_http_client()?;
    let coordinator = Arc::new(build_coordinator(&config, http)?);
    tracing::info!(redirect_uri = %coordinator.redirect_uri(), "oauth client configured");

    let server = CallbackServer::bind(
        &config.listen_address()?,
        coordinator.clone(),
        config.callback_path.clone(),
    )?;
    tracing::info!(addr = %server.local_addr(), "starting server");
    let mut running: RunningServer = server.start();

    let mut flow: JoinHandle<AppResult<()>> =
        tokio::spawn(run_mailbox_flow(coordinator, config.clone()));
    let mut flow_done = false;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let outcome = loop {
        let event = tokio::select! {
            err = running.failed() => Event::ServerFailed(err),
            _ = &mut shutdown => Event::Shutdown,
            joined = &mut flow, if !flow_done => Event::FlowFinished(flatten_join(joined)),
        };

        match event {
            Event::ServerFailed(err) => {
                tracing::error!("server error: {}", err);
                break Err(err);
            }
            Event::Shutdown => {
                tracing::info!("shutdown signal received");
                break Ok(());
            }
            Event::FlowFinished(Ok(())) => flow_done = true,
            Event::FlowFinished(Err(err)) => {
                tracing::error!("authorization flow failed: {}", err);
                break Err(err);
            }
        }
    };

    running.stop(config.shutdown_grace()).await;
    outcome
}
