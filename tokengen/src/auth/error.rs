//! Errors for the token-string flows and how clients should see them.

use super::credential::TokenKind;
use super::jwt::CodecError;

/// Message shown to clients for every failure that requires logging in again.
pub const REAUTHENTICATE_MESSAGE: &str = "Authentication required";

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unexpected token type: expected {expected}, got {actual}")]
    WrongTokenType { expected: TokenKind, actual: TokenKind },

    #[error("Storage error: {0}")]
    Storage(#[from] crate::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// What a request-handling layer should tell the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientOutcome {
    /// Log in again. Revoked, expired, forged and wrong-type tokens all land
    /// here so the response never reveals which check failed.
    Reauthenticate,
    /// The store was unavailable; the same request may succeed later.
    RetryLater,
    Internal,
}

impl ClientOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ClientOutcome::Reauthenticate => REAUTHENTICATE_MESSAGE,
            ClientOutcome::RetryLater => "Service temporarily unavailable",
            ClientOutcome::Internal => "Internal error",
        }
    }
}

impl AuthError {
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::TokenRevoked
                | AuthError::TokenExpired
                | AuthError::InvalidToken
                | AuthError::WrongTokenType { .. }
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Storage(e) if e.is_retryable())
    }

    pub fn client_outcome(&self) -> ClientOutcome {
        if self.requires_reauthentication() {
            ClientOutcome::Reauthenticate
        } else if self.is_retryable() {
            ClientOutcome::RetryLater
        } else {
            ClientOutcome::Internal
        }
    }
}

impl From<CodecError> for AuthError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Encode(msg) => AuthError::Internal(msg),
            CodecError::SignatureInvalid | CodecError::Malformed(_) => AuthError::InvalidToken,
        }
    }
}
