//! Error types for ragline.
//!
//! A single error enum covers every failure category the service can
//! report: configuration, I/O, question validation, index availability,
//! model credentials and model invocation.

use thiserror::Error;

/// Unified error type for ragline.
///
/// All fallible functions return `Result<T, AppError>`. Malformed model
/// output is deliberately absent: it is absorbed by answer normalization
/// and never surfaces as an error.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The question was rejected before any retrieval happened
    #[error("Invalid question: {0}")]
    Validation(String),

    /// The document index is missing or unreadable
    #[error("Retriever unavailable: {0}")]
    RetrieverUnavailable(String),

    /// Model credentials are missing or were rejected
    #[error("Model authentication error: {0}")]
    ModelAuth(String),

    /// Network, timeout or transport failure while calling the model
    #[error("Model invocation failed: {0}")]
    ModelInvocation(String),

    /// Retrieval and embedding errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error is the caller's fault (bad input) rather than ours.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }

    /// Whether this error originated at the external model boundary.
    pub fn is_upstream_error(&self) -> bool {
        matches!(self, AppError::ModelAuth(_) | AppError::ModelInvocation(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
