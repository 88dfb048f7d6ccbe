//! Error Module
//!
//! Defines error types and result types used throughout the caching proxy.

use thiserror::Error;

/// Main error type for the caching proxy
#[derive(Error, Debug, Clone)]
pub enum ProxyError {
    /// Client input that cannot be parsed into a request line.
    /// Aborts the offending session only; the origin is never contacted.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Connect, DNS, or read failure while talking to the origin.
    /// Nothing is cached for the affected key.
    #[error("Origin unreachable: {0}")]
    OriginUnreachable(String),

    /// Origin response without a header/body separator. The session
    /// degrades by passing the response through unmodified.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Cache store failure. Lookups degrade to a forced miss; write
    /// failures after a fetch are logged and swallowed.
    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("System error: {0}")]
    SystemError(String),
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::IoError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ProxyError {
    fn from(err: serde_yaml::Error) -> Self {
        ProxyError::ConfigError(err.to_string())
    }
}

/// Result type alias for the caching proxy
pub type Result<T> = std::result::Result<T, ProxyError>;
