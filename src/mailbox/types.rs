//! Usage: Wire types for the mailbox REST API (only the fields this crate reads).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesResponse {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub result_size_estimate: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessagePart {
    #[serde(default)]
    pub headers: Vec<MessageHeader>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

pub const NO_SUBJECT: &str = "No Subject";

impl Message {
    /// First `Subject` header; exact-case match.
    pub fn subject(&self) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name == "Subject")
            .map(|h| h.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub id: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub label_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListLabelsResponse {
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchRequest {
    pub topic_name: String,
    pub label_ids: Vec<String>,
}

/// `historyId` and `expiration` arrive as decimal strings (int64/uint64 in JSON).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchResponse {
    pub history_id: String,
    #[serde(default)]
    pub expiration: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_reads_exact_header() {
        let message: Message = serde_json::from_str(
            r#"{"id":"m1","payload":{"headers":[{"name":"From","value":"a@b"},{"name":"Subject","value":"Hello"}]}}"#,
        )
        .expect("decode");
        assert_eq!(message.subject(), Some("Hello"));
    }

    #[test]
    fn subject_missing_without_payload() {
        let message: Message = serde_json::from_str(r#"{"id":"m1"}"#).expect("decode");
        assert_eq!(message.subject(), None);
    }

    #[test]
    fn empty_mailbox_decodes_to_empty_list() {
        let resp: ListMessagesResponse =
            serde_json::from_str(r#"{"resultSizeEstimate":0}"#).expect("decode");
        assert!(resp.messages.is_empty());
    }

    #[test]
    fn watch_request_uses_camel_case() {
        let body = serde_json::to_value(WatchRequest {
            topic_name: "projects/p/topics/t".to_string(),
            label_ids: vec!["INBOX".to_string()],
        })
        .expect("encode");
        assert_eq!(body["topicName"], "projects/p/topics/t");
        assert_eq!(body["labelIds"][0], "INBOX");
    }
}
