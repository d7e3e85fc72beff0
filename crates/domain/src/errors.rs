//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for dexsync
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum DexError {
    /// Transient upstream failure (429 or 5xx). Retried at both the
    /// transport and worker layers.
    #[error("Transient upstream error: status {0}")]
    Transient(u16),

    /// Permanent upstream failure (any other non-2xx/304 status). Not
    /// given special treatment beyond the worker's generic attempt budget.
    #[error("Upstream error: status {0}")]
    Upstream(u16),

    /// Payload could not be parsed, or a required field was absent.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DexError {
    /// Whether the failure is expected to clear up on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Network(_))
    }
}

/// Result type alias for dexsync operations
pub type Result<T> = std::result::Result<T, DexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(DexError::Transient(503).is_transient());
        assert!(DexError::Network("connection reset".into()).is_transient());
        assert!(!DexError::Upstream(404).is_transient());
        assert!(!DexError::MalformedPayload("missing id".into()).is_transient());
    }

    #[test]
    fn errors_serialize_with_tag() {
        let err = DexError::Upstream(404);
        let json = serde_json::to_value(&err).expect("serializable");
        assert_eq!(json["type"], "Upstream");
    }
}
