//! Credential construction.

use std::sync::Arc;

use chrono::Duration;
use tracing::debug;

use crate::Result;
use crate::clock::{Clock, expiry_after};
use crate::database::repositories::GenerationRepository;

use super::credential::{AccessCredential, RefreshCredential};
use super::outcome::RenewOutcome;
use super::validator::GenerationValidator;

/// Builds refresh and access credentials.
///
/// Refresh credentials are stamped with the identity's generation from the
/// store. Access credentials are pure construction.
#[derive(Clone)]
pub struct CredentialFactory {
    repo: Arc<dyn GenerationRepository>,
    validator: GenerationValidator,
    clock: Arc<dyn Clock>,
}

impl CredentialFactory {
    pub fn new(
        repo: Arc<dyn GenerationRepository>,
        validator: GenerationValidator,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            validator,
            clock,
        }
    }

    /// New refresh credential at the identity's current generation, creating
    /// the generation record on first access.
    pub async fn new_refresh_credential(
        &self,
        identity: &str,
        ttl: Duration,
    ) -> Result<RefreshCredential> {
        let generation = self.repo.read_or_init(identity).await?;
        let expires_at = expiry_after(self.clock.now(), ttl);

        debug!(identity = %identity, generation, expires_at, "Refresh credential built");
        Ok(RefreshCredential {
            identity: identity.to_string(),
            generation,
            expires_at,
        })
    }

    /// New access credential. The caller must already have validated the
    /// refresh credential it derives from.
    pub fn new_access_credential(&self, identity: &str, ttl: Duration) -> AccessCredential {
        AccessCredential {
            identity: identity.to_string(),
            expires_at: expiry_after(self.clock.now(), ttl),
        }
    }

    /// Extend a refresh credential's expiry if its generation is current.
    ///
    /// A stale credential yields [`RenewOutcome::Revoked`] and is never
    /// re-stamped with the current generation.
    pub async fn renew_refresh_credential(
        &self,
        credential: &RefreshCredential,
        ttl: Duration,
    ) -> Result<RenewOutcome> {
        if !self.validator.is_current(credential).await? {
            return Ok(RenewOutcome::Revoked);
        }

        Ok(RenewOutcome::Renewed(RefreshCredential {
            expires_at: expiry_after(self.clock.now(), ttl),
            ..credential.clone()
        }))
    }
}
