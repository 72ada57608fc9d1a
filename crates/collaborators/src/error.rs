//! Collaborator service error types.

use thiserror::Error;

/// Errors raised by the collaborator services.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    InvalidConfig {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("cart service unreachable: {0}")]
    CartUnreachable(#[from] reqwest::Error),

    #[error("cart service returned status {0}")]
    CartRejected(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for collaborator results.
pub type Result<T> = std::result::Result<T, CollaboratorError>;
