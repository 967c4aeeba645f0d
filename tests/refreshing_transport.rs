mod support;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use inbox_auth::mailbox::MailboxClient;
use inbox_auth::oauth::{
    Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore, OAuthClientConfig,
    OAuthCoordinator, GMAIL_FULL_SCOPE,
};
use inbox_auth::shared::error::codes;
use support::{MailboxMock, TokenEndpointMock};

fn coordinator_with(tokens: &TokenEndpointMock, store: Arc<dyn CredentialStore>) -> OAuthCoordinator {
    let config = OAuthClientConfig {
        registration: support::registration(&tokens.token_url()),
        redirect_uri: "http://localhost:8080/oauth2/callback".to_string(),
        scopes: vec![GMAIL_FULL_SCOPE.to_string()],
    };
    OAuthCoordinator::new(config, store, reqwest::Client::new())
        .expect("coordinator")
        .with_auth_timeout(Duration::from_millis(50))
}

fn expired(refresh_token: &str) -> Credential {
    Credential::new(
        "T0",
        Some(refresh_token.to_string()),
        Some(Utc::now() - ChronoDuration::minutes(5)),
    )
}

#[tokio::test]
async fn expired_token_is_refreshed_and_saved_once() {
    let tokens = TokenEndpointMock::spawn().await;
    let mailbox = MailboxMock::spawn().await;
    let store = Arc::new(MemoryCredentialStore::with_credential(expired("R1")));
    let coordinator = coordinator_with(&tokens, store.clone());

    let transport = coordinator.get_client().await.expect("client");
    let client = MailboxClient::with_base_url(transport, mailbox.base_url(), "me");

    client.list_labels().await.expect("labels");
    assert_eq!(tokens.refreshes(), 1);
    assert_eq!(store.save_count(), 1);
    let saved = store.load().expect("load");
    assert_eq!(saved.access_token, "T1-refreshed-1");
    assert_eq!(saved.refresh_token(), Some("R1"));
    assert_eq!(mailbox.auth_headers(), vec!["Bearer T1-refreshed-1".to_string()]);

    client.list_labels().await.expect("labels again");
    assert_eq!(tokens.refreshes(), 1);
    assert_eq!(store.save_count(), 1);
}

#[tokio::test]
async fn valid_token_is_never_refreshed_or_saved() {
    let tokens = TokenEndpointMock::spawn().await;
    let mailbox = MailboxMock::spawn().await;
    let valid = Credential::new(
        "T-valid",
        Some("R1".to_string()),
        Some(Utc::now() + ChronoDuration::hours(1)),
    );
    let store = Arc::new(MemoryCredentialStore::with_credential(valid));
    let coordinator = coordinator_with(&tokens, store.clone());

    let transport = coordinator.get_client().await.expect("client");
    let client = MailboxClient::with_base_url(transport, mailbox.base_url(), "me");
    client.list_labels().await.expect("labels");
    client.list_messages(5).await.expect("messages");

    assert_eq!(tokens.refreshes(), 0);
    assert_eq!(store.save_count(), 0);
    assert!(mailbox.auth_headers().iter().all(|h| h == "Bearer T-valid"));
}

#[tokio::test]
async fn refreshed_token_is_written_to_the_token_file() {
    let tokens = TokenEndpointMock::spawn().await;
    let mailbox = MailboxMock::spawn().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let file_store = FileCredentialStore::new(dir.path().join("token.json"));
    file_store.write(&expired("R1")).expect("seed");
    let coordinator = coordinator_with(&tokens, Arc::new(file_store.clone()));

    let transport = coordinator.get_client().await.expect("client");
    MailboxClient::with_base_url(transport, mailbox.base_url(), "me")
        .list_labels()
        .await
        .expect("labels");

    let on_disk = file_store.load().expect("load");
    assert_eq!(on_disk.access_token, "T1-refreshed-1");
    assert_eq!(on_disk.refresh_token(), Some("R1"));
    assert!(on_disk.expiry.is_some_and(|e| e > Utc::now()));
}

#[tokio::test]
async fn revoked_refresh_token_requires_relogin() {
    let tokens = TokenEndpointMock::spawn().await;
    let mailbox = MailboxMock::spawn().await;
    let store = Arc::new(MemoryCredentialStore::with_credential(expired("revoked")));
    let coordinator = coordinator_with(&tokens, store.clone());

    let transport = coordinator.get_client().await.expect("client");
    let err = MailboxClient::with_base_url(transport, mailbox.base_url(), "me")
        .list_labels()
        .await
        .expect_err("relogin");

    assert!(err.is(codes::AUTH_RELOGIN_REQUIRED), "{err}");
    assert_eq!(store.save_count(), 0);
    assert!(mailbox.auth_headers().is_empty());
}
