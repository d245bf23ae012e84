//! tokengen - Session credentials with generation-counter revocation.
//!
//! Each identity has one durable, monotonically increasing generation. Refresh
//! credentials are stamped with it at issuance and are valid only while the
//! stored generation has not moved past them; advancing it revokes every
//! outstanding refresh credential for that identity at once.

pub mod auth;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
