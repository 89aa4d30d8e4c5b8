//! Error types for flasher-core.

use thiserror::Error;

/// Result type alias using ParseError.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that can occur while reading or writing deck documents.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid deck document: {0}")]
    Invalid(#[from] serde_yaml::Error),

    #[error("failed to serialize deck: {0}")]
    Serialize(String),
}
