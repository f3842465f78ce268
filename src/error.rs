use thiserror::Error;

use crate::atlas::AtlasError;
use crate::poll::PollError;

#[derive(Debug, Error)]
pub enum ColdlineError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Atlas API error: {0}")]
    Atlas(#[from] AtlasError),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Polling failed: {0}")]
    Poll(#[from] PollError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Classifies a failed probe for polling decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorClass {
    /// Misconfiguration or bad credentials — retrying cannot help.
    Fatal,
    /// Connectivity or not-ready-yet failure — retry after the delay.
    Retryable,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorClass::Fatal => write!(f, "Fatal"),
            ErrorClass::Retryable => write!(f, "Retryable"),
        }
    }
}

/// Classify a driver error: authentication and invalid-argument failures are
/// fatal, everything else (DNS, server selection, timeouts) is retryable
/// because the cluster may simply not exist yet.
pub fn classify_db_error(err: &mongodb::error::Error) -> ErrorClass {
    use mongodb::error::ErrorKind;
    match *err.kind {
        ErrorKind::Authentication { .. } => ErrorClass::Fatal,
        ErrorKind::InvalidArgument { .. } => ErrorClass::Fatal,
        _ => ErrorClass::Retryable,
    }
}
