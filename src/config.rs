//! Client configuration and data directory resolution.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

/// Default backend origin.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default API path prefix.
pub const DEFAULT_API_PREFIX: &str = "/api";

pub const ENV_API_URL: &str = "CEJAMSYS_API_URL";
pub const ENV_API_PREFIX: &str = "CEJAMSYS_API_PREFIX";
pub const ENV_ACCESS_TOKEN: &str = "CEJAMSYS_ACCESS_TOKEN";
pub const ENV_DATA_DIR: &str = "CEJAMSYS_DATA";

/// Options for [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend origin, without trailing slash.
    pub base_url: String,
    /// Path prefix, with leading and without trailing slash ("" allowed).
    pub prefix: String,
    /// Access token that overrides stored tokens (headless/test contexts).
    pub static_token: Option<String>,
    /// Request timeout; `None` keeps the transport default.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    /// Create a config for `base_url` with the default `/api` prefix.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            prefix: DEFAULT_API_PREFIX.to_string(),
            static_token: None,
            timeout: None,
        }
    }

    /// Read `CEJAMSYS_API_URL`, `CEJAMSYS_API_PREFIX` and
    /// `CEJAMSYS_ACCESS_TOKEN`, falling back to defaults.
    pub fn from_env() -> Self {
        let base_url = env::var(ENV_API_URL).unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let mut config = Self::new(base_url);
        if let Ok(prefix) = env::var(ENV_API_PREFIX) {
            config = config.prefix(prefix);
        }
        config.static_token(env::var(ENV_ACCESS_TOKEN).ok())
    }

    /// Set the path prefix. Normalized to `/segment` form.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = normalize_prefix(&prefix.into());
        self
    }

    /// Set the static access token; empty tokens are ignored.
    pub fn static_token(mut self, token: Option<String>) -> Self {
        self.static_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        let path = if path.starts_with('/') || path.is_empty() {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        format!("{}{}{}", self.base_url, self.prefix, path)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Directory holding the persisted auth tokens.
///
/// `CEJAMSYS_DATA` wins, then the platform data directory, then `./.data`.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = env::var_os(ENV_DATA_DIR) {
        return PathBuf::from(dir);
    }
    match ProjectDirs::from("br", "cejam", "cejamsys") {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => PathBuf::from(".").join(".data"),
    }
}
