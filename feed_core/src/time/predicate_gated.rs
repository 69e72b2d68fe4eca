use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::TimeProvider;

/// Wraps another `TimeProvider` and only lets the frontier advance while a
/// predicate over the current wall-clock time holds. While the predicate is false the gate holds `now_utc()` at the
/// last instant it was true.
pub struct PredicateGatedClock<P: TimeProvider> {
    inner: Arc<P>,
    predicate: Box<dyn Fn(DateTime<Utc>) -> bool + Send + Sync>,
    held_at: std::sync::Mutex<Option<DateTime<Utc>>>,
}

impl<P: TimeProvider> PredicateGatedClock<P> {
    pub fn new(inner: Arc<P>, predicate: impl Fn(DateTime<Utc>) -> bool + Send + Sync + 'static) -> Self {
        PredicateGatedClock { inner, predicate: Box::new(predicate), held_at: std::sync::Mutex::new(None) }
    }
}

impl<P: TimeProvider> TimeProvider for PredicateGatedClock<P> {
    fn now_utc(&self) -> DateTime<Utc> {
        let actual = self.inner.now_utc();
        let mut held = self.held_at.lock().expect("predicate gate lock poisoned");
        if (self.predicate)(actual) {
            *held = Some(actual);
            actual
        } else {
            // Never been true yet: hold the frontier in the indefinite past
            // rather than leaking the live time through the gate.
            held.unwrap_or(DateTime::<Utc>::MIN_UTC)
        }
    }
}
