//! Error types for calltrace
//!
//! None of these ever reach the caller of an intercepted statement or handler.
//! They surface from configuration parsing and the public helpers only.

use thiserror::Error;

/// Result type alias for calltrace operations
pub type TraceResult<T> = Result<T, TraceError>;

/// Error types for tracing support code
#[derive(Debug, Error)]
pub enum TraceError {
    /// Configuration could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Request body could not be read
    #[error("Body error: {0}")]
    Body(#[from] std::io::Error),

    /// Value could not be serialized for the log record
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
