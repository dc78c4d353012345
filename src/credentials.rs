//! Persistence for the single bearer token.
//!
//! The token is opaque: nothing here inspects or expires it. The file store
//! keeps it across process restarts; the memory store lives only as long as
//! the process and is what tests (and `--ephemeral`) use.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

/// Durable storage for one secret string.
pub trait CredentialStore: Send + Sync {
    /// Store the token, replacing any previous value.
    fn save(&self, token: &str) -> Result<()>;
    /// Return the stored token, if any. Never fails.
    fn load(&self) -> Option<String>;
    /// Remove the stored token. Safe to call when nothing is stored.
    fn clear(&self);
}

/// Token stored in a file, by default `~/.orthodash/token`.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Default location under the home directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".orthodash").join("token"))
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, token)
            .with_context(|| format!("Failed to write token to {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict {}", self.path.display()))?;
        }
        Ok(())
    }

    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let token = content.trim();
                if token.is_empty() {
                    None
                } else {
                    Some(token.to_string())
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "unreadable token file");
                None
            }
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove token file");
            }
        }
    }
}

/// In-process token storage.
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, token: &str) -> Result<()> {
        *self.token.lock() = Some(token.to_string());
        Ok(())
    }

    fn load(&self) -> Option<String> {
        self.token.lock().clone()
    }

    fn clear(&self) {
        *self.token.lock() = None;
    }
}
