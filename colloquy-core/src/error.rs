//! Error types for colloquy operations

use crate::a2a::{DiscoveryError, ProtocolError};

/// Result type for colloquy operations
pub type Result<T> = std::result::Result<T, ColloquyError>;

/// Error types for the colloquy harness
#[derive(Debug, thiserror::Error)]
pub enum ColloquyError {
    /// Agent discovery failed
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Protocol exchange failed
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Evaluation run failed
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Language-model gateway failure
    #[error("llm error: {0}")]
    Llm(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for ColloquyError {
    fn from(s: String) -> Self {
        ColloquyError::Other(s)
    }
}

impl From<&str> for ColloquyError {
    fn from(s: &str) -> Self {
        ColloquyError::Other(s.to_string())
    }
}
