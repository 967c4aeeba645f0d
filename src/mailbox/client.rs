//! Usage: Mailbox REST calls over an authenticated transport.

use super::types::{
    Label, ListLabelsResponse, ListMessagesResponse, Message, MessageRef, MessageSummary,
    WatchRequest, WatchResponse, NO_SUBJECT,
};
use crate::oauth::AuthenticatedTransport;
use crate::shared::error::AppResult;

pub const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";
pub const DEFAULT_USER: &str = "me";
pub const DEFAULT_MAX_RESULTS: u32 = 10;
pub const INBOX_LABEL: &str = "INBOX";

#[derive(Debug, Clone)]
pub struct MailboxClient {
    transport: AuthenticatedTransport,
    base_url: String,
    user: String,
}

impl MailboxClient {
    pub fn new(transport: AuthenticatedTransport, user: impl Into<String>) -> Self {
        Self::with_base_url(transport, DEFAULT_BASE_URL, user)
    }

    pub fn with_base_url(
        transport: AuthenticatedTransport,
        base_url: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user: user.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    fn user_url(&self, tail: &str) -> String {
        format!("{}/users/{}/{}", self.base_url, self.user, tail)
    }

    pub async fn list_messages(&self, max_results: u32) -> AppResult<Vec<MessageRef>> {
        let resp: ListMessagesResponse = self
            .transport
            .get_json_with_query(&self.user_url("messages"), &[("maxResults", max_results)])
            .await?;
        Ok(resp.messages)
    }

    pub async fn get_message(&self, id: &str) -> AppResult<Message> {
        self.transport
            .get_json(&self.user_url(&format!("messages/{id}")))
            .await
    }

    /// Lists recent messages with their subjects. A message that fails to load
    /// is logged and skipped; only the listing itself can fail.
    pub async fn list_recent(&self, max_results: u32) -> AppResult<Vec<MessageSummary>> {
        let refs = self.list_messages(max_results).await?;
        let mut out = Vec::with_capacity(refs.len());
        for (idx, message_ref) in refs.iter().enumerate() {
            match self.get_message(&message_ref.id).await {
                Ok(message) => out.push(MessageSummary {
                    id: message_ref.id.clone(),
                    subject: message.subject().unwrap_or(NO_SUBJECT).to_string(),
                }),
                Err(err) => {
                    tracing::warn!(index = idx + 1, message_id = %message_ref.id, "failed to get message: {}", err);
                }
            }
        }
        Ok(out)
    }

    pub async fn list_labels(&self) -> AppResult<Vec<Label>> {
        let resp: ListLabelsResponse = self.transport.get_json(&self.user_url("labels")).await?;
        Ok(resp.labels)
    }

    pub async fn start_watch(&self, topic_name: &str, label_ids: &[&str]) -> AppResult<WatchResponse> {
        let request = WatchRequest {
            topic_name: topic_name.to_string(),
            label_ids: label_ids.iter().map(|v| v.to_string()).collect(),
        };
        let resp: WatchResponse = self.transport.post_json(&self.user_url("watch"), &request).await?;
        tracing::info!(
            history_id = %resp.history_id,
            expiration = resp.expiration.as_deref().unwrap_or(""),
            "mailbox watch started"
        );
        Ok(resp)
    }

    pub async fn stop_watch(&self) -> AppResult<()> {
        self.transport.post_empty(&self.user_url("stop")).await?;
        tracing::info!("mailbox watch stopped");
        Ok(())
    }
}
