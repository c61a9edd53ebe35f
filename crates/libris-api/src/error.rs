use libris_http::ApiError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] libris_http::Error),

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response contained no data")]
    MissingData,

    /// The server answered with `status: false`.
    #[error("{message}")]
    Rejected { message: String },

    #[error("no student found with library ID {0}")]
    StudentNotFound(String),

    #[error("{0}")]
    NotEligible(String),

    #[error("cannot {action} while {stage}")]
    InvalidStage {
        action: &'static str,
        stage: &'static str,
    },
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Http(e) if e.is_cancelled())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Reduce to the displayable shape shown to users.
    pub fn to_api_error(&self) -> ApiError {
        match self {
            Error::Http(e) => e.to_api_error(),
            other => ApiError::new(other.to_string()),
        }
    }
}
