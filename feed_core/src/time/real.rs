use chrono::{DateTime, Utc};

use super::TimeProvider;

/// Wall-clock time. What the feed uses outside of tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct RealClock;

impl TimeProvider for RealClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
