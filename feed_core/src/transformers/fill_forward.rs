use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::data_model::DataPoint;
use crate::market_hours::TradingHours;
use crate::point_source::PointSource;

/// Second transformer in the pipeline. Applies only to
/// resolutions coarser than tick. When the upstream has no new point by the
/// next expected bar boundary, synthesizes one equal to the last real point
/// with `is_fill_forward = true`. Suppresses the synthetic bar outside
/// market hours unless `extended_hours` is set; real points (including
/// auxiliary events) always pass straight through untouched. Stops
/// generating synthetic bars at `end_utc`.
pub struct FillForward {
    upstream: Box<dyn PointSource>,
    increment: Duration,
    hours: Arc<TradingHours>,
    extended_hours: bool,
    end_utc: DateTime<Utc>,
    last_real: Option<DataPoint>,
    next_boundary: Option<DateTime<Utc>>,
    staged: Option<DataPoint>,
    current: Option<DataPoint>,
    done: bool,
}

impl FillForward {
    /// `increment` is `None` for tick resolution, in which case this
    /// transformer degrades to a passthrough.
    pub fn new(
        upstream: Box<dyn PointSource>,
        increment: Option<Duration>,
        hours: Arc<TradingHours>,
        extended_hours: bool,
        end_utc: DateTime<Utc>,
    ) -> Self {
        FillForward {
            upstream,
            increment: increment.unwrap_or(Duration::zero()),
            hours,
            extended_hours,
            end_utc,
            last_real: None,
            next_boundary: None,
            staged: None,
            current: None,
            done: false,
        }
    }

    fn passthrough_only(&self) -> bool {
        self.increment.is_zero()
    }

    fn stage_upstream(&mut self) -> bool {
        if self.staged.is_some() {
            return true;
        }
        if self.upstream.move_next() {
            self.staged = self.upstream.current().cloned();
            true
        } else {
            false
        }
    }

    fn pass_through(&mut self, point: DataPoint) {
        if !point.value.is_auxiliary() {
            self.last_real = Some(point.clone());
            self.next_boundary = Some(point.end_time + self.increment);
        }
        self.current = Some(point);
    }
}

impl PointSource for FillForward {
    fn move_next(&mut self) -> bool {
        if self.done {
            return false;
        }
        if self.passthrough_only() {
            if !self.upstream.move_next() {
                self.current = None;
                return false;
            }
            self.current = self.upstream.current().cloned();
            return true;
        }

        loop {
            if !self.stage_upstream() {
                self.current = None;
                return false;
            }
            let staged = self.staged.as_ref().unwrap();

            let (last, boundary) = match (&self.last_real, self.next_boundary) {
                (Some(last), Some(boundary)) => (last.clone(), boundary),
                _ => {
                    // No real point observed yet: nothing to fill forward from.
                    let point = self.staged.take().unwrap();
                    self.pass_through(point);
                    return true;
                }
            };

            if staged.value.is_auxiliary() || staged.start_time <= boundary {
                let point = self.staged.take().unwrap();
                self.pass_through(point);
                return true;
            }

            // Gap: the next real point starts after the expected boundary.
            if boundary >= self.end_utc {
                self.done = true;
                self.current = None;
                return false;
            }
            let synthetic_start = boundary - self.increment;
            self.next_boundary = Some(boundary + self.increment);
            if self.hours.is_market_open(boundary, self.extended_hours) {
                self.current = Some(last.fill_forward_of(synthetic_start, boundary));
                return true;
            }
            // Outside market hours: suppress this synthetic bar and try the
            // next boundary without consuming the staged real point.
        }
    }

    fn current(&self) -> Option<&DataPoint> {
        self.current.as_ref()
    }

    fn is_finished(&self) -> bool {
        self.done || (self.staged.is_none() && self.upstream.is_finished())
    }

    fn dispose(&mut self) {
        self.upstream.dispose();
    }
}
