//! `Subscription` owns exactly one ordered iterator chain plus the notifier
//! slot the owning source wakes when new data lands.

use std::sync::{Arc, Mutex};

use crate::data_model::{DataPoint, SubscriptionConfiguration};
use crate::point_source::BoxedSource;

/// Fired whenever the underlying source has new data ready. Set once by the
/// factory (C6) at construction and cleared on `dispose()`.
pub type DataAvailableCallback = Arc<dyn Fn() + Send + Sync>;

pub struct Subscription {
    configuration: SubscriptionConfiguration,
    source: BoxedSource,
    current: Option<DataPoint>,
    on_new_data_available: Mutex<Option<DataAvailableCallback>>,
    disposed: bool,
}

impl Subscription {
    pub fn new(configuration: SubscriptionConfiguration, source: BoxedSource) -> Self {
        Subscription {
            configuration,
            source,
            current: None,
            on_new_data_available: Mutex::new(None),
            disposed: false,
        }
    }

    pub fn configuration(&self) -> &SubscriptionConfiguration {
        &self.configuration
    }

    pub fn on_new_data_available(&self, callback: DataAvailableCallback) {
        *self.on_new_data_available.lock().expect("notifier lock poisoned") = Some(callback);
    }

    /// Fires the registered wake callback, if any. Called by the producer's
    /// notifier (built in `SubscriptionFactory`, which holds only a lookup
    /// key into the feed's subscription set, never this `Subscription`
    /// directly) whenever new data lands upstream.
    pub fn notify(&self) {
        if let Some(callback) = self.on_new_data_available.lock().expect("notifier lock poisoned").as_ref() {
            callback();
        }
    }

    /// Advances to the next point. Always `false` once `dispose()` has been
    /// called — a removed subscription emits nothing further
    ///.
    pub fn move_next(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        if self.source.move_next() {
            self.current = self.source.current().cloned();
            true
        } else {
            self.current = None;
            false
        }
    }

    pub fn current(&self) -> Option<&DataPoint> {
        if self.disposed {
            None
        } else {
            self.current.as_ref()
        }
    }

    pub fn is_finished(&self) -> bool {
        self.disposed || self.source.is_finished()
    }

    /// Idempotent. Safe to call while a producer callback targeting this
    /// subscription's source is in flight — the underlying bridge queue's
    /// own stop flag makes further pushes no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.source.dispose();
        self.current = None;
        *self.on_new_data_available.lock().expect("notifier lock poisoned") = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}
