use crate::data_model::DataPoint;
use crate::point_source::PointSource;

/// Passes only points matching `predicate`; drops the rest silently. Used by
/// the warmup stage to reject fill-forward and
/// future points surfaced by a file-based warmup replay.
pub struct Filter {
    upstream: Box<dyn PointSource>,
    predicate: Box<dyn Fn(&DataPoint) -> bool + Send>,
    current: Option<DataPoint>,
}

impl Filter {
    pub fn new(upstream: Box<dyn PointSource>, predicate: impl Fn(&DataPoint) -> bool + Send + 'static) -> Self {
        Filter { upstream, predicate: Box::new(predicate), current: None }
    }
}

impl PointSource for Filter {
    fn move_next(&mut self) -> bool {
        loop {
            if !self.upstream.move_next() {
                self.current = None;
                return false;
            }
            let point = self.upstream.current().cloned().expect("move_next returned true");
            if (self.predicate)(&point) {
                self.current = Some(point);
                return true;
            }
        }
    }

    fn current(&self) -> Option<&DataPoint> {
        self.current.as_ref()
    }

    fn is_finished(&self) -> bool {
        self.upstream.is_finished()
    }

    fn dispose(&mut self) {
        self.upstream.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::DataValue;
    use crate::point_source::VecSource;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_fill_forward_and_future_points() {
        let now = Utc::now();
        let mut real = DataPoint::new("ES", now, now, DataValue::Trade { price: dec!(1), volume: dec!(1) });
        let mut synthetic = real.clone();
        synthetic.is_fill_forward = true;
        let mut future = DataPoint::new("ES", now, now + Duration::days(1), DataValue::Trade { price: dec!(1), volume: dec!(1) });
        real.symbol = "real".into();
        synthetic.symbol = "synthetic".into();
        future.symbol = "future".into();

        let upstream = VecSource::new(vec![real, synthetic, future.clone()]);
        let cutoff = now;
        let mut filter = Filter::new(Box::new(upstream), move |p| !p.is_fill_forward && p.end_time <= cutoff);

        assert!(filter.move_next());
        assert_eq!(filter.current().unwrap().symbol, "real");
        assert!(!filter.move_next());
    }
}
