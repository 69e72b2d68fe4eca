use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

use super::TimeProvider;

/// A clock a test can drive by hand. Nanosecond timestamp stored atomically
/// so it can be shared across threads (e.g. a producer thread advancing the
/// frontier while the consumer polls it).
pub struct ManualClock {
    nanos: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock { nanos: AtomicI64::new(start.timestamp_nanos_opt().unwrap_or(0)) }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        self.nanos.store(time.timestamp_nanos_opt().unwrap_or(0), Ordering::SeqCst);
    }

    pub fn advance(&self, delta: chrono::Duration) {
        self.nanos.fetch_add(delta.num_nanoseconds().unwrap_or(0), Ordering::SeqCst);
    }
}

impl TimeProvider for ManualClock {
    fn now_utc(&self) -> DateTime<Utc> {
        let nanos = self.nanos.load(Ordering::SeqCst);
        DateTime::from_timestamp_nanos(nanos)
    }
}
