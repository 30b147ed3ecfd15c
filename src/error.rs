//! Error types for the library fixer.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the library fixer.
#[derive(Error, Debug)]
pub enum Error {
    // File system errors
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    // Planning errors
    #[error("Ambiguous media item: {0}")]
    Ambiguity(String),

    #[error("Destination collision: {0}")]
    Collision(String),

    // Metadata errors
    #[error("Metadata lookup timed out after {0}s")]
    ResolutionTimeout(u64),

    #[error("Metadata lookup failed: {0}")]
    ResolutionFailure(String),

    // Execute errors
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    // Config errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // TOML errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }
}
