//! Domain error types and error handling.
//!
//! Rotation rejections are not represented here: a refresh token that cannot
//! be rotated yields [`crate::domain::RotationOutcome::Rejected`], keeping
//! "no valid session" apart from "system unavailable".

use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl DomainError {
    /// Shorthand for a storage-layer failure
    pub fn storage(message: impl Into<String>) -> Self {
        DomainError::Storage {
            message: message.into(),
        }
    }

    /// Whether the caller should retry later rather than re-authenticate
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DomainError::Storage { .. } | DomainError::Internal { .. })
    }

    /// Whether the error stems from a fatal misconfiguration
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DomainError::Configuration { .. }
                | DomainError::Token(TokenError::MissingSigningKey)
                | DomainError::Token(TokenError::KeyLoadError { .. })
        )
    }
}

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token format")]
    InvalidTokenFormat,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token not yet valid")]
    TokenNotYetValid,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Token generation failed")]
    TokenGenerationFailed,

    #[error("No signing key configured")]
    MissingSigningKey,

    #[error("Key load error: {message}")]
    KeyLoadError { message: String },
}

pub type DomainResult<T> = Result<T, DomainError>;
