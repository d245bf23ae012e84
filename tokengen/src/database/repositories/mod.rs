//! Repository layer for the generation store.

pub mod generation;
pub mod memory;

pub use generation::*;
pub use memory::*;
