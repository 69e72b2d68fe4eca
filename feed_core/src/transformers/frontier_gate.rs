use std::sync::Arc;

use crate::data_model::DataPoint;
use crate::point_source::PointSource;
use crate::time::TimeProvider;

/// Last transformer in every pipeline. Suspends emission
/// while the staged point's `end_time` is ahead of the frontier clock;
/// returns "no data right now" rather than blocking. Never drops a point —
/// it is held until the frontier catches up.
pub struct FrontierGate {
    upstream: Box<dyn PointSource>,
    frontier: Arc<dyn TimeProvider>,
    pending: Option<DataPoint>,
    current: Option<DataPoint>,
}

impl FrontierGate {
    pub fn new(upstream: Box<dyn PointSource>, frontier: Arc<dyn TimeProvider>) -> Self {
        FrontierGate { upstream, frontier, pending: None, current: None }
    }
}

impl PointSource for FrontierGate {
    fn move_next(&mut self) -> bool {
        if self.pending.is_none() && !self.upstream.move_next() {
            self.current = None;
            return false;
        }
        if self.pending.is_none() {
            self.pending = self.upstream.current().cloned();
        }
        match &self.pending {
            Some(point) if point.end_time <= self.frontier.now_utc() => {
                self.current = self.pending.take();
                true
            }
            _ => {
                self.current = None;
                false
            }
        }
    }

    fn current(&self) -> Option<&DataPoint> {
        self.current.as_ref()
    }

    fn is_finished(&self) -> bool {
        self.pending.is_none() && self.upstream.is_finished()
    }

    fn dispose(&mut self) {
        self.upstream.dispose();
    }
}
