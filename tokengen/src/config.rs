//! Runtime configuration loaded from environment variables.
//!
//! Every loader has a `from_lookup` twin taking a key lookup function, so
//! callers (and tests) can supply values without touching the process env.

use std::time::Duration;

use crate::database::default_read_pool_size;
use crate::{Error, Result};

/// Default SQLite database URL.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:tokengen.db?mode=rwc";

/// Default per-operation deadline for the generation store.
pub const DEFAULT_STORE_OP_TIMEOUT_MS: u64 = 5_000;

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn is_in_memory_url(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Token lifetime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Refresh token lifetime in days (default: 7)
    pub refresh_token_ttl_days: i64,
    /// Access token lifetime in minutes (default: 60)
    pub access_token_ttl_minutes: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_token_ttl_days: 7,
            access_token_ttl_minutes: 60,
        }
    }
}

impl SessionConfig {
    /// Create SessionConfig from environment variables.
    ///
    /// Environment variables:
    /// - `REFRESH_TOKEN_TTL_DAYS`: Refresh token lifetime in days (default: 7)
    /// - `ACCESS_TOKEN_TTL_MINUTES`: Access token lifetime in minutes (default: 60)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            refresh_token_ttl_days: parse_or(
                &lookup,
                "REFRESH_TOKEN_TTL_DAYS",
                defaults.refresh_token_ttl_days,
            ),
            access_token_ttl_minutes: parse_or(
                &lookup,
                "ACCESS_TOKEN_TTL_MINUTES",
                defaults.access_token_ttl_minutes,
            ),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_token_ttl_days <= 0
            || chrono::Duration::try_days(self.refresh_token_ttl_days).is_none()
        {
            return Err(Error::config(format!(
                "REFRESH_TOKEN_TTL_DAYS must be a positive number of days, got {}",
                self.refresh_token_ttl_days
            )));
        }
        if self.access_token_ttl_minutes <= 0
            || chrono::Duration::try_minutes(self.access_token_ttl_minutes).is_none()
        {
            return Err(Error::config(format!(
                "ACCESS_TOKEN_TTL_MINUTES must be a positive number of minutes, got {}",
                self.access_token_ttl_minutes
            )));
        }
        Ok(())
    }
}

/// Generation store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite database URL (e.g., "sqlite:tokengen.db?mode=rwc")
    pub database_url: String,
    /// Read pool size
    pub max_read_connections: u32,
    /// Deadline for a single store operation, busy retries included
    pub op_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_read_connections: default_read_pool_size(),
            op_timeout: Duration::from_millis(DEFAULT_STORE_OP_TIMEOUT_MS),
        }
    }
}

impl StoreConfig {
    /// Create StoreConfig from environment variables.
    ///
    /// Environment variables:
    /// - `DATABASE_URL`: SQLite URL (default: `sqlite:tokengen.db?mode=rwc`)
    /// - `DATABASE_MAX_CONNECTIONS`: Read pool size (default: derived from CPU count)
    /// - `STORE_OP_TIMEOUT_MS`: Per-operation deadline in milliseconds (default: 5000)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let database_url = lookup("DATABASE_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.database_url);
        let timeout_ms = parse_or(
            &lookup,
            "STORE_OP_TIMEOUT_MS",
            DEFAULT_STORE_OP_TIMEOUT_MS,
        );

        Self {
            database_url,
            max_read_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.max_read_connections,
            ),
            op_timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Reject settings the store cannot run with.
    ///
    /// In-memory SQLite URLs are refused: the read and write pools would each
    /// open their own private database.
    pub fn validate(&self) -> Result<()> {
        if is_in_memory_url(&self.database_url) {
            return Err(Error::config(
                "DATABASE_URL must point to a database file, not an in-memory database",
            ));
        }
        if self.max_read_connections == 0 {
            return Err(Error::config("DATABASE_MAX_CONNECTIONS must be at least 1"));
        }
        if self.op_timeout.is_zero() {
            return Err(Error::config("STORE_OP_TIMEOUT_MS must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.refresh_token_ttl_days, 7);
        assert_eq!(config.access_token_ttl_minutes, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_session_config_from_lookup() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("REFRESH_TOKEN_TTL_DAYS", "30"),
            ("ACCESS_TOKEN_TTL_MINUTES", " 15 "),
        ]));
        assert_eq!(config.refresh_token_ttl_days, 30);
        assert_eq!(config.access_token_ttl_minutes, 15);
    }

    #[test]
    fn test_session_config_ignores_garbage() {
        let config = SessionConfig::from_lookup(lookup_from(&[("REFRESH_TOKEN_TTL_DAYS", "soon")]));
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_session_config_rejects_non_positive_ttl() {
        let config = SessionConfig {
            access_token_ttl_minutes: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_session_config_rejects_zero_refresh_ttl_from_env() {
        let config = SessionConfig::from_lookup(lookup_from(&[("REFRESH_TOKEN_TTL_DAYS", "0")]));
        assert_eq!(config.refresh_token_ttl_days, 0);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_session_config_rejects_overflowing_ttl() {
        let config = SessionConfig {
            refresh_token_ttl_days: i64::MAX,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_store_config_rejects_in_memory_urls() {
        for url in [
            "sqlite::memory:",
            "sqlite://:memory:",
            "sqlite:file:tokens?mode=memory&cache=shared",
        ] {
            let config = StoreConfig::from_lookup(lookup_from(&[("DATABASE_URL", url)]));
            assert!(
                matches!(config.validate(), Err(Error::Configuration(_))),
                "{} should be rejected",
                url
            );
        }
    }

    #[test]
    fn test_store_config_from_lookup() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite:/var/lib/tokengen/gen.db?mode=rwc"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("STORE_OP_TIMEOUT_MS", "250"),
        ]));
        assert_eq!(config.database_url, "sqlite:/var/lib/tokengen/gen.db?mode=rwc");
        assert_eq!(config.max_read_connections, 4);
        assert_eq!(config.op_timeout, Duration::from_millis(250));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_store_config_defaults_when_unset() {
        let config = StoreConfig::from_lookup(|_| None);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(
            config.op_timeout,
            Duration::from_millis(DEFAULT_STORE_OP_TIMEOUT_MS)
        );
        assert!(config.max_read_connections >= 1);
    }

    #[test]
    fn test_store_config_rejects_zero_timeout() {
        let config = StoreConfig::from_lookup(lookup_from(&[("STORE_OP_TIMEOUT_MS", "0")]));
        assert!(config.validate().is_err());
    }
}
