//! The pull interface every transformer, queue bridge, and warmup stage
//! implements. Modeled as a `move_next()` / `current()` pair rather than
//! `std::iter::Iterator` because `false` from `move_next()` is
//! overloaded: for a live bridge it means "no data right now, try again
//! later"; for a finite historical replay it means "exhausted". Callers that
//! need to tell the two apart use `is_finished()`.

use crate::data_model::DataPoint;

/// A source of data points a subscription pipeline can pull from.
///
/// Contract: `current()` returns the point most recently produced by
/// `move_next()`. A `move_next()` returning `false` does not imply
/// `is_finished()` — the caller is expected to poll again on its own
/// schedule.
pub trait PointSource: Send {
    fn move_next(&mut self) -> bool;

    fn current(&self) -> Option<&DataPoint>;

    /// `true` once this source will never again produce a point, even given
    /// unlimited further polling. Default `false` fits live, never-ending
    /// sources (bridge queues, polled producers before their upstream signals
    /// end). Finite sources (warmup replays, a bounded queue after `stop()`)
    /// override it.
    fn is_finished(&self) -> bool {
        false
    }

    /// Releases any resources held (producer subscriptions, file handles).
    /// Safe to call multiple times; safe to call while a producer callback
    /// targeting this source is in flight.
    fn dispose(&mut self) {}
}

pub type BoxedSource = Box<dyn PointSource>;

/// An in-memory source that replays a fixed sequence then reports finished.
/// Used by warmup stages that materialize history eagerly, and by tests.
pub struct VecSource {
    points: std::vec::IntoIter<DataPoint>,
    current: Option<DataPoint>,
    finished: bool,
}

impl VecSource {
    pub fn new(points: Vec<DataPoint>) -> Self {
        VecSource { points: points.into_iter(), current: None, finished: false }
    }

    pub fn empty() -> Self {
        VecSource::new(Vec::new())
    }
}

impl PointSource for VecSource {
    fn move_next(&mut self) -> bool {
        match self.points.next() {
            Some(point) => {
                self.current = Some(point);
                true
            }
            None => {
                self.current = None;
                self.finished = true;
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
}
