use thiserror::Error;

/// Failure taxonomy shared by every core operation. Gateway failures
/// propagate unchanged to the calling component; nothing retries.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid status '{0}' (expected Pending, Approved, or Rejected)")]
    InvalidStatus(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("resume analysis failed: {0}")]
    Analysis(String),

    #[error("statistics unavailable: {0}")]
    StatsUnavailable(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
