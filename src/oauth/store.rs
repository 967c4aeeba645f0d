//! Usage: Credential persistence (JSON token file, plus an in-memory store).

use super::credential::Credential;
use crate::shared::error::{codes, AppError, AppResult};
use crate::shared::mutex_ext::MutexExt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persisted home of the single user's credential.
///
/// `save` is best-effort: implementations log failures and never escalate them,
/// so callers must not assume the record is durable.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> AppResult<Credential>;

    fn save(&self, credential: &Credential);
}

#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fallible half of [`CredentialStore::save`].
    pub fn write(&self, credential: &Credential) -> AppResult<()> {
        let content = serde_json::to_vec_pretty(credential).map_err(|e| {
            AppError::with_source(codes::SYSTEM_ERROR, "failed to serialize credential", e)
        })?;
        write_file_atomic(&self.path, &content)
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> AppResult<Credential> {
        let content = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(AppError::new(
                    codes::NOT_FOUND,
                    format!("no credential stored at {}", self.path.display()),
                ));
            }
            Err(err) => {
                return Err(AppError::with_source(
                    codes::IO_ERROR,
                    format!("failed to read {}: {err}", self.path.display()),
                    err,
                ));
            }
        };

        serde_json::from_slice::<Credential>(&content).map_err(|err| {
            AppError::with_source(
                codes::DECODE_ERROR,
                format!("invalid credential file {}: {err}", self.path.display()),
                err,
            )
        })
    }

    fn save(&self, credential: &Credential) {
        match self.write(credential) {
            Ok(()) => tracing::info!(path = %self.path.display(), "credential saved"),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), "unable to save credential: {}", err)
            }
        }
    }
}

fn write_file_atomic(path: &Path, bytes: &[u8]) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::new(
                codes::IO_ERROR,
                format!("failed to create dir {}: {e}", parent.display()),
            )
        })?;
    }

    let file_name = path
        .file_name()
        .and_then(|v| v.to_str())
        .unwrap_or("token.json");
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    write_private_file(&tmp_path, bytes).map_err(|e| {
        AppError::new(
            codes::IO_ERROR,
            format!("failed to write temp file {}: {e}", tmp_path.display()),
        )
    })?;

    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(AppError::new(
            codes::IO_ERROR,
            format!("failed to finalize file {}: {e}", path.display()),
        ));
    }

    Ok(())
}

#[cfg(unix)]
fn write_private_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, bytes)
}

/// Process-local store. Records every saved credential so embedders can
/// observe refresh activity.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    current: Mutex<Option<Credential>>,
    saves: Mutex<Vec<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded store; the seed does not count as a save.
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            current: Mutex::new(Some(credential)),
            saves: Mutex::new(Vec::new()),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock_or_recover().len()
    }

    pub fn saved(&self) -> Vec<Credential> {
        self.saves.lock_or_recover().clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> AppResult<Credential> {
        self.current
            .lock_or_recover()
            .clone()
            .ok_or_else(|| AppError::new(codes::NOT_FOUND, "no credential stored in memory"))
    }

    fn save(&self, credential: &Credential) {
        *self.current.lock_or_recover() = Some(credential.clone());
        self.saves.lock_or_recover().push(credential.clone());
    }
}
