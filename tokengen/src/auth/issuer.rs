//! Session issuance, re-validation and revoke-all.
//!
//! [`SessionIssuer`] ties the generation store, the credential factory and the
//! codec together. The typed operations work on credential records and report
//! a stale generation as an explicit outcome. The token-string operations add
//! decoding, type and expiry checks on top and report every rejection as an
//! [`AuthError`].

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SessionConfig;
use crate::database::repositories::GenerationRepository;
use crate::{Error, Result};

use super::credential::{AccessCredential, Credential, RefreshCredential, TokenKind};
use super::error::AuthError;
use super::factory::CredentialFactory;
use super::jwt::JwtCodec;
use super::outcome::{AccessOutcome, RenewOutcome};
use super::validator::GenerationValidator;

fn require_identity(identity: &str) -> Result<()> {
    if identity.is_empty() {
        return Err(Error::validation("identity must not be empty"));
    }
    Ok(())
}

fn refresh_ttl(days: i64) -> Result<Duration> {
    Duration::try_days(days)
        .filter(|ttl| *ttl > Duration::zero())
        .ok_or_else(|| Error::validation(format!("invalid refresh TTL: {} days", days)))
}

fn access_ttl(minutes: i64) -> Result<Duration> {
    Duration::try_minutes(minutes)
        .filter(|ttl| *ttl > Duration::zero())
        .ok_or_else(|| Error::validation(format!("invalid access TTL: {} minutes", minutes)))
}

/// Issues, re-validates and revokes session credentials.
#[derive(Clone)]
pub struct SessionIssuer {
    repo: Arc<dyn GenerationRepository>,
    factory: CredentialFactory,
    validator: GenerationValidator,
    codec: Arc<JwtCodec>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionIssuer {
    /// Create an issuer on the system clock.
    pub fn new(
        repo: Arc<dyn GenerationRepository>,
        codec: JwtCodec,
        config: SessionConfig,
    ) -> Result<Self> {
        Self::with_clock(repo, codec, config, Arc::new(SystemClock))
    }

    /// Create an issuer on the given clock.
    ///
    /// Fails with [`Error::Configuration`] if `config` has an unusable TTL.
    pub fn with_clock(
        repo: Arc<dyn GenerationRepository>,
        codec: JwtCodec,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let validator = GenerationValidator::new(repo.clone());
        let factory = CredentialFactory::new(repo.clone(), validator.clone(), clock.clone());
        Ok(Self {
            repo,
            factory,
            validator,
            codec: Arc::new(codec),
            clock,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ========================================================================
    // Credential-level operations
    // ========================================================================

    /// Issue a refresh credential stamped with the identity's current generation.
    pub async fn issue_refresh(&self, identity: &str, ttl_days: i64) -> Result<RefreshCredential> {
        require_identity(identity)?;
        let ttl = refresh_ttl(ttl_days)?;

        let credential = self.factory.new_refresh_credential(identity, ttl).await?;
        info!(
            identity = %identity,
            generation = credential.generation,
            "Refresh credential issued"
        );
        Ok(credential)
    }

    /// Derive an access credential from a refresh credential.
    ///
    /// Returns [`AccessOutcome::Revoked`] when the refresh credential's
    /// generation is behind the store. The refresh credential's expiry is the
    /// caller's to check.
    pub async fn issue_access(
        &self,
        refresh: &RefreshCredential,
        ttl_minutes: i64,
    ) -> Result<AccessOutcome> {
        let ttl = access_ttl(ttl_minutes)?;

        if !self.validator.is_current(refresh).await? {
            return Ok(AccessOutcome::Revoked);
        }

        let access = self.factory.new_access_credential(&refresh.identity, ttl);
        debug!(identity = %refresh.identity, expires_at = access.expires_at, "Access credential issued");
        Ok(AccessOutcome::Granted(access))
    }

    /// Extend a refresh credential whose generation is still current.
    pub async fn renew_refresh(
        &self,
        refresh: &RefreshCredential,
        ttl_days: i64,
    ) -> Result<RenewOutcome> {
        let ttl = refresh_ttl(ttl_days)?;
        self.factory.renew_refresh_credential(refresh, ttl).await
    }

    /// Invalidate every refresh credential issued to `identity` so far.
    ///
    /// Returns the new generation.
    pub async fn revoke_all(&self, identity: &str) -> Result<i64> {
        require_identity(identity)?;

        let generation = self.repo.advance(identity).await?;
        info!(identity = %identity, generation, "All refresh credentials revoked");
        Ok(generation)
    }

    /// Stored generation for `identity` (0 if it has none). Never writes.
    pub async fn current_generation(&self, identity: &str) -> Result<i64> {
        self.repo.current(identity).await
    }

    // ========================================================================
    // Token-string operations
    // ========================================================================

    /// Issue a serialized refresh token with the configured lifetime.
    pub async fn issue_refresh_token(&self, identity: &str) -> std::result::Result<String, AuthError> {
        let credential = self
            .issue_refresh(identity, self.config.refresh_token_ttl_days)
            .await?;
        Ok(self.codec.encode(&Credential::from(credential))?)
    }

    /// Exchange a refresh token for a serialized access token.
    pub async fn exchange_refresh_token(&self, token: &str) -> std::result::Result<String, AuthError> {
        let refresh = self.decode_refresh(token)?;
        let access = self
            .issue_access(&refresh, self.config.access_token_ttl_minutes)
            .await?
            .into_result()?;
        Ok(self.codec.encode(&Credential::from(access))?)
    }

    /// Renew a refresh token. A revoked token is refused, never revived.
    pub async fn renew_refresh_token(&self, token: &str) -> std::result::Result<String, AuthError> {
        let refresh = self.decode_refresh(token)?;
        let renewed = self
            .renew_refresh(&refresh, self.config.refresh_token_ttl_days)
            .await?
            .into_result()?;
        Ok(self.codec.encode(&Credential::from(renewed))?)
    }

    /// Verify a serialized access token. Access tokens carry no generation, so
    /// only the signature, type and expiry are checked.
    pub fn verify_access_token(&self, token: &str) -> std::result::Result<AccessCredential, AuthError> {
        match self.codec.decode(token)? {
            Credential::Access(access) => {
                if access.is_expired_at(self.clock.now()) {
                    debug!(identity = %access.identity, "Access token expired");
                    return Err(AuthError::TokenExpired);
                }
                Ok(access)
            }
            other => Err(AuthError::WrongTokenType {
                expected: TokenKind::Access,
                actual: other.kind(),
            }),
        }
    }

    fn decode_refresh(&self, token: &str) -> std::result::Result<RefreshCredential, AuthError> {
        let credential = self.codec.decode(token).inspect_err(|e| {
            debug!(error = %e, "Refresh token rejected by codec");
        })?;

        match credential {
            Credential::Refresh(refresh) => {
                if refresh.is_expired_at(self.clock.now()) {
                    debug!(identity = %refresh.identity, "Refresh token expired");
                    return Err(AuthError::TokenExpired);
                }
                Ok(refresh)
            }
            other => {
                warn!(identity = %other.identity(), "Access token presented as refresh token");
                Err(AuthError::WrongTokenType {
                    expected: TokenKind::Refresh,
                    actual: other.kind(),
                })
            }
        }
    }
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("codec", &self.codec)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::clock::{ManualClock, secs_to_datetime};
    use crate::database::repositories::MemoryGenerationRepository;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Access is granted iff no revoke happened after the refresh was issued.
        #[test]
        fn prop_access_gated_by_generation(
            before in 0u32..5,
            after in 0u32..5,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .expect("runtime");

            let granted = rt.block_on(async {
                let repo = Arc::new(MemoryGenerationRepository::new());
                let issuer = SessionIssuer::with_clock(
                    repo,
                    JwtCodec::new(b"test-secret-key-32-chars-long!!!"),
                    SessionConfig::default(),
                    Arc::new(ManualClock::new(secs_to_datetime(1_700_000_000))),
                )
                .unwrap();

                for _ in 0..before {
                    issuer.revoke_all("u1").await.unwrap();
                }
                let refresh = issuer.issue_refresh("u1", 7).await.unwrap();
                for _ in 0..after {
                    issuer.revoke_all("u1").await.unwrap();
                }
                issuer.issue_access(&refresh, 60).await.unwrap().is_granted()
            });

            prop_assert_eq!(granted, after == 0);
        }
    }
}
