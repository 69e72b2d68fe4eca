//! C1: time providers. Everything downstream (the frontier gate, the
//! custom-data exchange, warmup bounding) reads "now" through a
//! `TimeProvider` rather than calling `Utc::now()` directly, so tests can
//! drive the clock deterministically.

mod manual;
mod predicate_gated;
mod real;

pub use manual::ManualClock;
pub use predicate_gated::PredicateGatedClock;
pub use real::RealClock;

use chrono::{DateTime, Utc};

/// A source of "now" for the frontier gate to compare
/// against a data point's `end_time`.
pub trait TimeProvider: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}
