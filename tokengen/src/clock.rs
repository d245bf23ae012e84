//! Time source for credential expiry.
//!
//! Credentials carry their expiry as Unix epoch seconds (UTC). The clock is
//! injected into the factory and issuer so tests can move time explicitly.

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// `now + ttl` as Unix epoch seconds, saturating instead of overflowing.
#[inline]
pub fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> i64 {
    now.checked_add_signed(ttl)
        .map(|dt| dt.timestamp())
        .unwrap_or(if ttl < Duration::zero() {
            i64::MIN
        } else {
            i64::MAX
        })
}

/// Convert Unix epoch seconds to `DateTime<Utc>`.
///
/// Values outside chrono's supported range clamp to the nearest representable timestamp.
#[inline]
pub fn secs_to_datetime(secs: i64) -> DateTime<Utc> {
    match Utc.timestamp_opt(secs, 0) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(dt, _) => dt,
        chrono::LocalResult::None => {
            if secs.is_negative() {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let start = secs_to_datetime(1_700_000_000);
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now().timestamp(), 1_700_000_300);

        clock.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_expiry_after_adds_ttl() {
        let now = secs_to_datetime(1_000);
        assert_eq!(expiry_after(now, Duration::days(1)), 1_000 + 86_400);
        assert_eq!(expiry_after(now, Duration::minutes(-1)), 940);
    }

    #[test]
    fn test_expiry_after_saturates() {
        let now = secs_to_datetime(1_000);
        assert_eq!(expiry_after(now, Duration::MAX), i64::MAX);
        assert_eq!(expiry_after(now, Duration::MIN), i64::MIN);
    }

    #[test]
    fn test_secs_to_datetime_clamps() {
        assert_eq!(secs_to_datetime(i64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(secs_to_datetime(i64::MIN), DateTime::<Utc>::MIN_UTC);
        assert_eq!(secs_to_datetime(0).timestamp(), 0);
    }
}
