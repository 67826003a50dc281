//! Auth token persistence.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Fixed storage key for the token pair.
pub const STORAGE_KEY: &str = "cejamsys.auth";

/// Access/refresh token pair issued by `/auth/token/`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    pub access: String,
    pub refresh: String,
}

impl Tokens {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// Manual impl so tokens never reach logs.
impl std::fmt::Debug for Tokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokens")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Durable key-value storage for the token pair.
pub trait TokenStore: Send + Sync {
    /// Stored tokens; unreadable or malformed entries count as absent.
    fn load(&self) -> Option<Tokens>;

    fn save(&self, tokens: &Tokens) -> Result<(), ApiError>;

    fn clear(&self) -> Result<(), ApiError>;
}

/// Tokens kept in `<dir>/cejamsys.auth.json`.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{}.json", STORAGE_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_error(&self, message: impl ToString) -> ApiError {
        ApiError::TokenStorage {
            path: self.path.clone(),
            message: message.to_string(),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<Tokens> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(tokens) => Some(tokens),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring malformed token file");
                None
            }
        }
    }

    fn save(&self, tokens: &Tokens) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.storage_error(e))?;
        }
        let content = serde_json::to_string(tokens).map_err(|e| self.storage_error(e))?;
        std::fs::write(&self.path, content).map_err(|e| self.storage_error(e))
    }

    fn clear(&self) -> Result<(), ApiError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_error(e)),
        }
    }
}

/// In-process token storage.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<Tokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: Tokens) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<Tokens> {
        self.tokens.lock().ok()?.clone()
    }

    fn save(&self, tokens: &Tokens) -> Result<(), ApiError> {
        let mut slot = self.tokens.lock().unwrap_or_else(|p| p.into_inner());
        *slot = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        let mut slot = self.tokens.lock().unwrap_or_else(|p| p.into_inner());
        *slot = None;
        Ok(())
    }
}
