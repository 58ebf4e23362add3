//! Error types for Minister

use thiserror::Error;

/// Classification of aggregator failures
///
/// Handlers inspect this to give authentication and invalid-request
/// failures a more specific message; every other kind is stringified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorErrorKind {
    /// Bad or missing API key
    Authentication,
    /// The aggregator rejected the request parameters
    InvalidRequest,
    /// Any other error reported by the aggregator
    Api,
    /// The aggregator could not be reached
    Connection,
    /// An account refresh reported a terminal failure
    RefreshFailed,
    /// An account refresh did not finish within the poll budget
    Timeout,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("{message}")]
    Aggregator {
        kind: AggregatorErrorKind,
        message: String,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backup error: {0}")]
    Backup(String),
}

impl Error {
    pub fn aggregator(kind: AggregatorErrorKind, message: impl Into<String>) -> Self {
        Self::Aggregator {
            kind,
            message: message.into(),
        }
    }

    /// The aggregator error kind, if this error came from the aggregator
    pub fn aggregator_kind(&self) -> Option<AggregatorErrorKind> {
        match self {
            Self::Aggregator { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
