//! Refresh and access credential records.
//!
//! These are the claim sets carried inside signed tokens. Expiry is stored as
//! Unix epoch seconds (`exp`) and is authoritative; the codec adds no
//! timestamps of its own.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::secs_to_datetime;

/// Token kind, carried as the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Refresh,
    Access,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Refresh => "refresh",
            TokenKind::Access => "access",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Long-lived credential used to mint access credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshCredential {
    /// Identity the credential was issued to
    #[serde(rename = "sub")]
    pub identity: String,
    /// Identity generation at issuance
    pub generation: i64,
    /// Expiry, Unix epoch seconds (UTC)
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl RefreshCredential {
    pub fn expiry(&self) -> DateTime<Utc> {
        secs_to_datetime(self.expires_at)
    }

    /// Expired once `now` reaches `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at
    }
}

/// Short-lived credential for per-request authorization.
///
/// Carries no generation: once issued, only its expiry limits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential {
    #[serde(rename = "sub")]
    pub identity: String,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl AccessCredential {
    pub fn expiry(&self) -> DateTime<Utc> {
        secs_to_datetime(self.expires_at)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at
    }
}

/// Either credential, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credential {
    Refresh(RefreshCredential),
    Access(AccessCredential),
}

impl Credential {
    pub fn kind(&self) -> TokenKind {
        match self {
            Credential::Refresh(_) => TokenKind::Refresh,
            Credential::Access(_) => TokenKind::Access,
        }
    }

    pub fn identity(&self) -> &str {
        match self {
            Credential::Refresh(c) => &c.identity,
            Credential::Access(c) => &c.identity,
        }
    }

    pub fn expires_at(&self) -> i64 {
        match self {
            Credential::Refresh(c) => c.expires_at,
            Credential::Access(c) => c.expires_at,
        }
    }
}

impl From<RefreshCredential> for Credential {
    fn from(credential: RefreshCredential) -> Self {
        Credential::Refresh(credential)
    }
}

impl From<AccessCredential> for Credential {
    fn from(credential: AccessCredential) -> Self {
        Credential::Access(credential)
    }
}
