//! Bounded queue bridge. Adapts a push producer (broker callback, custom-data
//! poll worker) to the pull `PointSource` interface the rest of the pipeline
//! speaks, with bounded buffering and an idempotent stop sentinel: one
//! producer handle cloned out to callback sites, one consumer retained by
//! the owner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError};
use std::sync::Arc;

use crate::data_model::DataPoint;
use crate::point_source::PointSource;

enum QueueItem {
    Point(DataPoint),
    Stop,
}

/// Default bound on in-flight points per subscription before `enqueue`
/// blocks the producer thread. Sized generously — live market data rarely runs this many
/// ticks behind a consuming slice loop before backpressure is desirable.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Handle given to the external producer (a queue handler's callback
/// thread, or C4's poll worker). Cheap to clone; every clone shares the same
/// underlying channel and stop flag.
#[derive(Clone)]
pub struct QueueProducer {
    sender: SyncSender<QueueItem>,
    stopped: Arc<AtomicBool>,
    on_data: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl QueueProducer {
    /// Enqueues `point`. A no-op once `stop()` has been called — pushes
    /// after stop are discarded silently, never an error.
    /// Blocks the calling thread briefly if the bound is saturated; never
    /// reorders.
    pub fn enqueue(&self, point: DataPoint) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        if self.sender.send(QueueItem::Point(point)).is_ok() {
            if let Some(notify) = &self.on_data {
                notify();
            }
        }
    }

    /// Idempotent. After the first call, every subsequent `enqueue` and
    /// `stop` is a no-op.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            let _ = self.sender.send(QueueItem::Stop);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// Consumer half, retained by the `Subscription` that owns this bridge.
pub struct QueueConsumer {
    receiver: Receiver<QueueItem>,
    stopped: Arc<AtomicBool>,
    finished: bool,
    current: Option<DataPoint>,
}

impl PointSource for QueueConsumer {
    fn move_next(&mut self) -> bool {
        if self.finished {
            return false;
        }
        match self.receiver.try_recv() {
            Ok(QueueItem::Point(point)) => {
                self.current = Some(point);
                true
            }
            Ok(QueueItem::Stop) => {
                self.stopped.store(true, Ordering::Release);
                self.finished = true;
                self.current = None;
                false
            }
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => {
                self.stopped.store(true, Ordering::Release);
                self.finished = true;
                self.current = None;
                false
            }
        }
    }

    fn current(&self) -> Option<&DataPoint> {
        self.current.as_ref()
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn dispose(&mut self) {
        self.stopped.store(true, Ordering::Release);
    }
}

/// Constructs a bridge pair. `on_data`, if supplied, fires once per
/// successful enqueue — used to wake the owning `Subscription`'s
/// `on_new_data_available` slot.
pub fn bounded_queue(
    capacity: usize,
    on_data: Option<Arc<dyn Fn() + Send + Sync>>,
) -> (QueueProducer, QueueConsumer) {
    let (sender, receiver) = sync_channel(capacity.max(1));
    let stopped = Arc::new(AtomicBool::new(false));
    let producer = QueueProducer { sender, stopped: stopped.clone(), on_data };
    let consumer = QueueConsumer { receiver, stopped, finished: false, current: None };
    (producer, consumer)
}
