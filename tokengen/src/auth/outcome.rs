//! Explicit results for credentials that are well-formed but no longer current.
//!
//! Returned instead of errors so callers must handle the revoked case.

use super::credential::{AccessCredential, RefreshCredential};
use super::error::AuthError;

/// Result of asking for an access credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    Granted(AccessCredential),
    /// The refresh credential's generation is behind the store.
    Revoked,
}

impl AccessOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessOutcome::Granted(_))
    }

    pub fn into_result(self) -> Result<AccessCredential, AuthError> {
        match self {
            AccessOutcome::Granted(credential) => Ok(credential),
            AccessOutcome::Revoked => Err(AuthError::TokenRevoked),
        }
    }
}

/// Result of renewing a refresh credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewOutcome {
    Renewed(RefreshCredential),
    /// A stale credential is never revived; the holder must log in again.
    Revoked,
}

impl RenewOutcome {
    pub fn is_renewed(&self) -> bool {
        matches!(self, RenewOutcome::Renewed(_))
    }

    pub fn into_result(self) -> Result<RefreshCredential, AuthError> {
        match self {
            RenewOutcome::Renewed(credential) => Ok(credential),
            RenewOutcome::Revoked => Err(AuthError::TokenRevoked),
        }
    }
}
