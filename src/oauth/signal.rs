//! Usage: Single-slot handoff of a freshly exchanged credential from the
//! callback handler to the waiting authorization flow.

use super::credential::Credential;
use crate::shared::error::{codes, AppError, AppResult};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Bounded to one slot; a delivery while the slot is occupied is dropped.
#[derive(Debug)]
pub(crate) struct PendingAuthorization {
    tx: mpsc::Sender<Credential>,
    rx: Mutex<mpsc::Receiver<Credential>>,
}

impl PendingAuthorization {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Non-blocking write. Returns `false` when the credential was dropped.
    pub(crate) fn offer(&self, credential: Credential) -> bool {
        // Both channel halves live in `self`, so the only failure is a full slot.
        if self.tx.try_send(credential).is_err() {
            tracing::warn!("authorization slot already full; dropping credential delivery");
            return false;
        }
        true
    }

    pub(crate) async fn wait(&self, timeout: Duration) -> AppResult<Credential> {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(timeout, rx.recv())
            .await
            .ok()
            .flatten()
            .ok_or_else(|| {
                AppError::new(
                    codes::AUTH_TIMEOUT,
                    format!(
                        "timeout waiting for authorization after {}s",
                        timeout.as_secs_f64()
                    ),
                )
            })
    }
}
