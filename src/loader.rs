//! Catalog loading from files, strings and HTTP URLs.
//!
//! A catalog is either a bare JSON array of resource configs or an object
//! with a `resources` array.

use std::path::Path;
use std::time::Duration;

use serde_json::Value;

use crate::error::SchemaError;
use crate::schema::{Registry, ResourceConfig};

/// Default timeout for catalog downloads (10 seconds).
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a catalog from a file path.
///
/// # Errors
///
/// Returns `SchemaError::FileNotFound` if the file doesn't exist,
/// `SchemaError::InvalidJson` if it isn't a valid catalog, or a registry
/// error for duplicate keys.
pub fn load_catalog(path: &Path) -> Result<Registry, SchemaError> {
    if !path.exists() {
        return Err(SchemaError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| SchemaError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_catalog_str(&content)
}

/// Load a catalog from a JSON string.
pub fn load_catalog_str(content: &str) -> Result<Registry, SchemaError> {
    let value: Value =
        serde_json::from_str(content).map_err(|source| SchemaError::InvalidJson { source })?;
    catalog_from_value(value)
}

/// Build a registry from an already-parsed catalog document.
pub fn catalog_from_value(value: Value) -> Result<Registry, SchemaError> {
    let list = match value {
        Value::Object(mut map) => map.remove("resources").unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    let configs: Vec<ResourceConfig> =
        serde_json::from_value(list).map_err(|source| SchemaError::InvalidJson { source })?;
    Registry::new(configs)
}

/// Load a catalog from an HTTP/HTTPS URL.
///
/// # Errors
///
/// Transport failures and non-2xx statuses are reported as
/// `SchemaError::ReadError` with the URL as path.
pub fn load_catalog_url(url: &str) -> Result<Registry, SchemaError> {
    let read_error = |message: String| SchemaError::ReadError {
        path: url.into(),
        source: std::io::Error::other(message),
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| read_error(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| read_error(e.to_string()))?;

    let value: Value = response.json().map_err(|e| read_error(e.to_string()))?;
    catalog_from_value(value)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a catalog from a file path or URL.
pub fn load_catalog_auto(source: &str) -> Result<Registry, SchemaError> {
    if is_url(source) {
        load_catalog_url(source)
    } else {
        load_catalog(Path::new(source))
    }
}
