use thiserror::Error;

/// ccwrapped error types
#[derive(Error, Debug)]
pub enum WrappedError {
    /// Failed to parse JSON/JSONL
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stats cache could not be read as a well-formed document
    #[error("cache error: {0}")]
    Cache(String),

    /// Pricing fetch failed
    #[error("pricing error: {0}")]
    Pricing(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for ccwrapped
pub type Result<T> = std::result::Result<T, WrappedError>;
