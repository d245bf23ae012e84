//! Generation counter database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-identity generation counter.
///
/// Created lazily with generation 0 and only ever incremented; rows are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct GenerationDbModel {
    /// Caller-supplied identity key (user or account identifier)
    pub identity: String,
    /// Current generation; refresh tokens stamped below this are revoked
    pub generation: i64,
}

impl GenerationDbModel {
    /// A fresh record, as created on first access.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            generation: 0,
        }
    }
}
