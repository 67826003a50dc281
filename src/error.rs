//! Error types for the API client, resource schemas and list stores.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    // Connectivity (exit code 3)
    #[error("cannot connect to backend at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {message}")]
    Transport { message: String },

    // Authentication (exit code 4)
    #[error("{message}")]
    Unauthorized { message: String },

    #[error("not logged in: run `cejamsys login` first")]
    NotLoggedIn,

    // Business / server errors (exit code 1)
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("invalid JSON in response from {path}: {source}")]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected response from {path}: {message}")]
    UnexpectedShape { path: String, message: String },

    // Token storage (exit code 3)
    #[error("token storage at {path}: {message}")]
    TokenStorage { path: PathBuf, message: String },
}

impl ApiError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Connect { .. } | Self::Transport { .. } | Self::TokenStorage { .. } => 3,
            Self::Unauthorized { .. } | Self::NotLoggedIn => 4,
            _ => 1,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }

    /// Whether this error means no response was obtained at all.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }
}

/// Errors in resource catalog definitions.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate resource key \"{key}\"")]
    DuplicateKey { key: String },

    #[error("unknown resource \"{key}\"")]
    UnknownResource { key: String },

    #[error("invalid resource \"{key}\": {message}")]
    InvalidResource { key: String, message: String },

    #[error("unknown field \"{field}\" on resource \"{resource}\"")]
    UnknownField { resource: String, field: String },

    #[error("invalid field {resource}.{field}: {message}")]
    InvalidField {
        resource: String,
        field: String,
        message: String,
    },
}

impl SchemaError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound { .. } | Self::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors returned by [`crate::ResourceStore`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{operation} is disabled for {resource}")]
    NotAllowed {
        resource: String,
        operation: &'static str,
    },

    #[error("record {id} is locked for editing")]
    Locked { id: String },

    #[error("unknown action \"{action}\" for {resource}")]
    UnknownAction { resource: String, action: String },

    #[error("action \"{action}\" is not available for record {id}")]
    ActionUnavailable { action: String, id: String },

    #[error("\"{field}\" is not a filter of {resource}")]
    UnknownFilter { resource: String, field: String },

    #[error("store for {resource} is closed")]
    Closed { resource: String },
}

impl StoreError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Api(e) => e.exit_code(),
            Self::Closed { .. } => 1,
            _ => 2,
        }
    }
}

/// Single payload validation error with path context.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_exit_codes() {
        let err = ApiError::Http {
            status: 400,
            message: "CPF invalido".into(),
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.status(), Some(400));

        let err = ApiError::Unauthorized {
            message: "Token expirado".into(),
        };
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.status(), Some(401));

        assert_eq!(ApiError::NotLoggedIn.exit_code(), 4);
    }

    #[test]
    fn http_error_displays_server_message_verbatim() {
        let err = ApiError::Http {
            status: 400,
            message: "Aluno ja matriculado nesta turma.".into(),
        };
        assert_eq!(err.to_string(), "Aluno ja matriculado nesta turma.");
    }

    #[test]
    fn schema_error_exit_codes() {
        let err = SchemaError::FileNotFound {
            path: PathBuf::from("catalog.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = SchemaError::DuplicateKey {
            key: "alunos".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn store_error_delegates_exit_code() {
        let err = StoreError::Api(ApiError::NotLoggedIn);
        assert_eq!(err.exit_code(), 4);

        let err = StoreError::NotAllowed {
            resource: "permissoes".into(),
            operation: "create",
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn field_error_display() {
        let err = FieldError {
            path: "/turma".into(),
            message: "required".into(),
        };
        assert_eq!(err.to_string(), "/turma: required");
    }
}
