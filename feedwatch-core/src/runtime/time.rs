//! Wall-clock access behind a trait so the health check can be driven deterministically

use crate::core::Timestamp;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of "now" for every staleness computation
pub trait TimeSource: Send + Sync {
    /// Current time in epoch milliseconds
    fn now_millis(&self) -> Timestamp;

    /// Current time as a `SystemTime`
    fn now_instant(&self) -> SystemTime;
}

/// Production clock backed by `SystemTime::now()`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now_millis(&self) -> Timestamp {
        to_millis(SystemTime::now())
    }

    fn now_instant(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Convert a `SystemTime` to epoch milliseconds (pre-epoch clamps to 0)
pub fn to_millis(time: SystemTime) -> Timestamp {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis() as Timestamp
}

/// Convert epoch milliseconds back to a `SystemTime`
pub fn from_millis(millis: Timestamp) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis.max(0) as u64)
}
