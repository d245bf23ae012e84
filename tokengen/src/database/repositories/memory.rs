//! In-process generation store.
//!
//! Backed by a `DashMap`; entry access holds the shard lock, so per-identity
//! updates are atomic while different identities rarely contend. Only suitable
//! when a single process issues and validates tokens.

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::info;

use crate::Result;
use crate::database::models::GenerationDbModel;

use super::generation::GenerationRepository;

/// In-memory implementation of GenerationRepository.
#[derive(Debug, Default)]
pub struct MemoryGenerationRepository {
    records: DashMap<String, GenerationDbModel>,
}

impl MemoryGenerationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of identities with a record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl GenerationRepository for MemoryGenerationRepository {
    async fn find(&self, identity: &str) -> Result<Option<GenerationDbModel>> {
        Ok(self.records.get(identity).map(|record| record.clone()))
    }

    async fn read_or_init(&self, identity: &str) -> Result<i64> {
        let record = self
            .records
            .entry(identity.to_string())
            .or_insert_with(|| GenerationDbModel::new(identity));
        Ok(record.generation)
    }

    async fn advance(&self, identity: &str) -> Result<i64> {
        let generation = {
            let mut record = self
                .records
                .entry(identity.to_string())
                .or_insert_with(|| GenerationDbModel::new(identity));
            record.generation += 1;
            record.generation
        };

        info!(identity = %identity, generation, "Generation advanced");
        Ok(generation)
    }
}
