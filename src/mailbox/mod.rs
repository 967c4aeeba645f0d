//! Usage: Read-only mailbox operations and push-notification watch management.

pub mod client;
pub mod types;

pub use client::{MailboxClient, DEFAULT_BASE_URL, DEFAULT_MAX_RESULTS, DEFAULT_USER, INBOX_LABEL};
pub use types::{Label, Message, MessageRef, MessageSummary, WatchResponse};
