use std::time::Duration;

use qxlink_core::Timestamp;

/// Wall time as the broker protocol sees it
///
/// Request ids and expirations are seeded from whole unix seconds, and the
/// `tick` keepalive lands on wall-clock multiples of its interval, so tests
/// pin both through this port.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Whole unix seconds, the seed for request ids and expirations
    fn unix_seconds(&self) -> i64 {
        self.now().timestamp()
    }

    /// Time left until the wall clock reaches the next multiple of `every`.
    /// A clock sitting exactly on a boundary waits a full period.
    fn until_next_multiple(&self, every: Duration) -> Duration {
        let every_ms = i64::try_from(every.as_millis()).unwrap_or(i64::MAX).max(1);
        let remaining = every_ms - self.now().timestamp_millis().rem_euclid(every_ms);
        Duration::from_millis(remaining.unsigned_abs())
    }
}
