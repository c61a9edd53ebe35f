//! Error types for libris-http.

use std::fmt;
use std::io;

use serde_json::Value;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The uniform failure shape handed to calling code.
///
/// `message` is always non-empty and suitable for direct display.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>,
    pub payload: Option<Value>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            "Request failed".to_string()
        } else {
            message
        };
        Self {
            message,
            status: None,
            payload: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Generic message used when the server gave nothing readable.
    pub fn status_failure(status: u16) -> Self {
        Self::new(format!("Request failed with status {status}")).with_status(status)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Error)]
pub enum Error {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("request was cancelled")]
    Aborted,

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("interceptor failed: {0}")]
    Interceptor(String),

    #[error("failed to encode JSON: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[cfg(feature = "reqwest")]
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl Error {
    /// HTTP status carried by (or wrapped in) this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(e) => e.status,
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Aborted)
    }

    /// Connection-level failures the pipeline converts into a synthetic response.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Reduce any failure to the displayable [`ApiError`] shape.
    pub fn to_api_error(&self) -> ApiError {
        match self {
            Error::Api(e) => e.clone(),
            Error::Network(_) => ApiError::new(
                "Network error: unable to reach the server. Please check your connection.",
            ),
            Error::Timeout => {
                ApiError::new("The server took too long to respond. Please try again.")
            }
            Error::Aborted => ApiError::new("The request was cancelled."),
            other => ApiError::new(other.to_string()),
        }
    }
}
