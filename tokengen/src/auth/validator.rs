//! Generation check for presented refresh credentials.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::Result;
use crate::database::repositories::GenerationRepository;

use super::credential::RefreshCredential;

/// Decides whether a refresh credential's generation is still current.
///
/// Uses the read-only [`GenerationRepository::current`], so validating a
/// credential for an unknown identity never creates a record. Expiry is not
/// checked here.
#[derive(Clone)]
pub struct GenerationValidator {
    repo: Arc<dyn GenerationRepository>,
}

impl GenerationValidator {
    pub fn new(repo: Arc<dyn GenerationRepository>) -> Self {
        Self { repo }
    }

    /// `true` iff `credential.generation >= store generation`.
    ///
    /// Storage failures are returned as errors and never read as a verdict.
    pub async fn is_current(&self, credential: &RefreshCredential) -> Result<bool> {
        let stored = self.repo.current(&credential.identity).await?;
        let current = credential.generation >= stored;

        if current {
            debug!(
                identity = %credential.identity,
                generation = credential.generation,
                "Refresh credential generation is current"
            );
        } else {
            warn!(
                identity = %credential.identity,
                presented = credential.generation,
                stored,
                "Refresh credential generation is stale"
            );
        }

        Ok(current)
    }
}
