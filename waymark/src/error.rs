use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;

use crate::response::{BoxBody, IntoResponse};

/// Request-time error rendered as a JSON response.
#[derive(Debug)]
pub struct Error {
    pub status: u16,
    pub message: String,
}

impl Error {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: 400,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: 404,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: 500,
            message: msg.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> http::Response<BoxBody> {
        let body = serde_json::json!({
            "error": {
                "status": self.status,
                "message": self.message,
            }
        });
        let mut response = http::Response::new(Full::new(Bytes::from(body.to_string())));
        *response.status_mut() = self.status_code();
        response.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        response
    }
}

impl From<ContainerError> for Error {
    fn from(err: ContainerError) -> Self {
        Error::internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Route table construction failures. Any of these aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no Cargo.toml found in {} or any parent directory", start.display())]
    ProjectRootNotFound { start: PathBuf },

    #[error("source file for `{type_name}` not found (recorded as `{recorded}`)")]
    SourceNotFound { type_name: String, recorded: String },

    #[error("source file for `{type_name}` is ambiguous: {candidates:?}")]
    AmbiguousSource {
        type_name: String,
        candidates: Vec<PathBuf>,
    },

    #[error("{method} {path} is claimed by both `{first}` and `{second}`")]
    DuplicateRoute {
        method: String,
        path: String,
        first: String,
        second: String,
    },

    #[error("i/o error while deriving routes: {0}")]
    Io(#[from] std::io::Error),
}

/// Service container failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ContainerError {
    #[error("service not registered: {type_name}")]
    NotRegistered { type_name: &'static str },

    #[error("failed to downcast service: {type_name}")]
    Downcast { type_name: &'static str },

    #[error("circular dependency while resolving {type_name}")]
    CircularDependency { type_name: &'static str },

    #[error("failed to construct {type_name}: {reason}")]
    Construction {
        type_name: &'static str,
        reason: String,
    },
}

/// Invalid environment configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}: `{value}`")]
    Invalid { key: &'static str, value: String },
}
