use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("camera is not connected: {0}")]
    NotConnected(String),

    #[error("invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("camera not found: {0}")]
    NotFound(Uuid),

    #[error("stale camera update: expected version {expected}, stored version {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_connected(msg: impl Into<String>) -> Self {
        Self::NotConnected(msg.into())
    }
}
