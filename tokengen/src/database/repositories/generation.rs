//! Generation store repository.
//!
//! The only persistent state in the system: one counter per identity. Every
//! statement binds the identity as a parameter, and each mutation is a single
//! atomic upsert, so concurrent callers across processes never race on the
//! same row.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::{DEFAULT_STORE_OP_TIMEOUT_MS, StoreConfig};
use crate::database::models::GenerationDbModel;
use crate::database::retry::with_store_deadline;
use crate::database::{DbPool, WritePool, init_pool_with_size, init_write_pool, run_migrations};
use crate::{Error, Result};

const SELECT_GENERATION: &str =
    "SELECT identity, generation FROM token_generation WHERE identity = ?";

// The no-op update makes RETURNING yield the existing row on conflict.
const UPSERT_INITIAL: &str = r#"
    INSERT INTO token_generation (identity, generation) VALUES (?, 0)
    ON CONFLICT(identity) DO UPDATE SET generation = generation
    RETURNING generation
"#;

const UPSERT_INCREMENT: &str = r#"
    INSERT INTO token_generation (identity, generation) VALUES (?, 1)
    ON CONFLICT(identity) DO UPDATE SET generation = generation + 1
    RETURNING generation
"#;

/// Generation store: durable identity → generation mapping.
#[async_trait]
pub trait GenerationRepository: Send + Sync {
    /// Look up the record for an identity without creating it.
    async fn find(&self, identity: &str) -> Result<Option<GenerationDbModel>>;

    /// Current generation, treating a missing record as generation 0. Never writes.
    async fn current(&self, identity: &str) -> Result<i64> {
        Ok(self
            .find(identity)
            .await?
            .map_or(0, |record| record.generation))
    }

    /// Current generation, creating the record at 0 on first access.
    async fn read_or_init(&self, identity: &str) -> Result<i64>;

    /// Increment the generation by one (creating the record first if needed)
    /// and return the new value. Revokes every refresh token issued before the call.
    async fn advance(&self, identity: &str) -> Result<i64>;
}

/// SQLx implementation of GenerationRepository.
pub struct SqlxGenerationRepository {
    pool: DbPool,
    write_pool: WritePool,
    op_timeout: Duration,
}

impl SqlxGenerationRepository {
    /// Create a repository over existing pools. Migrations must already have run.
    pub fn new(pool: DbPool, write_pool: WritePool) -> Self {
        Self {
            pool,
            write_pool,
            op_timeout: Duration::from_millis(DEFAULT_STORE_OP_TIMEOUT_MS),
        }
    }

    /// Override the per-operation deadline.
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Open both pools and run migrations. Pair with [`close`](Self::close) at shutdown.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let write_pool = init_write_pool(&config.database_url).await?;
        run_migrations(&write_pool).await?;
        let pool = init_pool_with_size(&config.database_url, config.max_read_connections).await?;

        info!(
            max_read_connections = config.max_read_connections,
            op_timeout = ?config.op_timeout,
            "Generation store opened"
        );

        Ok(Self::new(pool, write_pool).with_op_timeout(config.op_timeout))
    }

    /// Close both pools, waiting for in-flight queries to finish.
    pub async fn close(&self) {
        self.write_pool.close().await;
        self.pool.close().await;
        info!("Generation store closed");
    }

    pub fn op_timeout(&self) -> Duration {
        self.op_timeout
    }
}

#[async_trait]
impl GenerationRepository for SqlxGenerationRepository {
    async fn find(&self, identity: &str) -> Result<Option<GenerationDbModel>> {
        let pool = &self.pool;
        with_store_deadline("find", self.op_timeout, || async move {
            sqlx::query_as::<_, GenerationDbModel>(SELECT_GENERATION)
                .bind(identity)
                .fetch_optional(pool)
                .await
                .map_err(Error::from)
        })
        .await
    }

    async fn read_or_init(&self, identity: &str) -> Result<i64> {
        let pool = &self.pool;
        let write_pool = &self.write_pool;

        // Fast path and upsert share one deadline.
        let (generation, created) =
            with_store_deadline("read_or_init", self.op_timeout, || async move {
                let existing = sqlx::query_as::<_, GenerationDbModel>(SELECT_GENERATION)
                    .bind(identity)
                    .fetch_optional(pool)
                    .await
                    .map_err(Error::from)?;
                if let Some(record) = existing {
                    return Ok((record.generation, false));
                }

                let generation = sqlx::query_scalar::<_, i64>(UPSERT_INITIAL)
                    .bind(identity)
                    .fetch_one(write_pool)
                    .await
                    .map_err(Error::from)?;
                Ok::<_, Error>((generation, true))
            })
            .await?;

        if created {
            debug!(identity = %identity, generation, "Generation record initialized");
        }
        Ok(generation)
    }

    async fn advance(&self, identity: &str) -> Result<i64> {
        let write_pool = &self.write_pool;
        let generation = with_store_deadline("advance", self.op_timeout, || async move {
            sqlx::query_scalar::<_, i64>(UPSERT_INCREMENT)
                .bind(identity)
                .fetch_one(write_pool)
                .await
                .map_err(Error::from)
        })
        .await?;

        info!(identity = %identity, generation, "Generation advanced");
        Ok(generation)
    }
}
