//! Database row models.

pub mod generation;

pub use generation::GenerationDbModel;
