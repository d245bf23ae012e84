//! Busy-retry and deadline helpers for generation store operations.

use rand::random;
use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::{Error, Result};

const BUSY_BASE_DELAY_MS: u64 = 5;
const BUSY_MAX_DELAY_MS: u64 = 500;

pub(crate) fn is_sqlite_busy_error(err: &Error) -> bool {
    let Error::DatabaseSqlx(sqlx_err) = err else {
        return false;
    };

    let sqlx::Error::Database(db_err) = sqlx_err else {
        let msg = sqlx_err.to_string().to_ascii_lowercase();
        return msg.contains("database is locked") || msg.contains("database is busy");
    };

    // SQLITE_BUSY = 5, SQLITE_LOCKED = 6
    let code = db_err.code().map(Cow::into_owned);
    if matches!(code.as_deref(), Some("5") | Some("6")) {
        return true;
    }

    let msg = db_err.message().to_ascii_lowercase();
    msg.contains("database is locked") || msg.contains("database is busy")
}

/// Backoff before retry `attempt` (0-based): capped exponential plus up to 25% jitter.
fn busy_backoff(attempt: u32) -> Duration {
    let exp_ms = BUSY_BASE_DELAY_MS.saturating_mul(1u64 << attempt.min(16));
    let capped_ms = exp_ms.min(BUSY_MAX_DELAY_MS);
    let jitter_ms = random::<u64>() % (capped_ms / 4 + 1);
    Duration::from_millis((capped_ms + jitter_ms).min(BUSY_MAX_DELAY_MS))
}

/// Run a store operation under a deadline, retrying SQLite busy/locked errors.
///
/// Non-busy errors return immediately. Running past `deadline` yields
/// [`Error::StorageTimeout`]; a timeout is never turned into a default value.
pub async fn with_store_deadline<T, F, Fut>(
    op_name: &'static str,
    deadline: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = async {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if is_sqlite_busy_error(&err) => {
                    let delay = busy_backoff(attempt);
                    debug!(
                        op = op_name,
                        attempt = attempt + 1,
                        delay = ?delay,
                        "SQLite busy, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    };

    match timeout(deadline, attempts).await {
        Ok(result) => result,
        Err(_) => {
            warn!(op = op_name, timeout = ?deadline, "Generation store operation timed out");
            Err(Error::StorageTimeout {
                op: op_name,
                timeout: deadline,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn busy() -> Error {
        Error::DatabaseSqlx(sqlx::Error::Protocol("database is locked".to_string()))
    }

    #[test]
    fn test_busy_detection() {
        assert!(is_sqlite_busy_error(&busy()));
        assert!(!is_sqlite_busy_error(&Error::DatabaseSqlx(
            sqlx::Error::RowNotFound
        )));
        assert!(!is_sqlite_busy_error(&Error::validation("nope")));
    }

    #[test]
    fn test_backoff_is_capped() {
        for attempt in 0..40 {
            assert!(busy_backoff(attempt) <= Duration::from_millis(BUSY_MAX_DELAY_MS));
        }
        assert!(busy_backoff(0) >= Duration::from_millis(BUSY_BASE_DELAY_MS));
    }

    #[tokio::test]
    async fn test_retries_busy_then_succeeds() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_store_deadline("test_op", Duration::from_secs(5), || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(busy())
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_busy_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<i64> =
            with_store_deadline("test_op", Duration::from_secs(5), || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::DatabaseSqlx(sqlx::Error::PoolClosed))
            })
            .await;

        assert!(matches!(result, Err(Error::DatabaseSqlx(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deadline_yields_storage_timeout() {
        let result: Result<i64> =
            with_store_deadline("read_or_init", Duration::from_millis(20), || async {
                sleep(Duration::from_secs(10)).await;
                Ok(0)
            })
            .await;

        match result {
            Err(Error::StorageTimeout { op, timeout }) => {
                assert_eq!(op, "read_or_init");
                assert_eq!(timeout, Duration::from_millis(20));
            }
            other => panic!("expected StorageTimeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_persistent_busy_hits_deadline() {
        let result: Result<i64> =
            with_store_deadline("advance", Duration::from_millis(50), || async { Err(busy()) })
                .await;
        assert!(matches!(result, Err(Error::StorageTimeout { .. })));
    }
}
