use chrono::{DateTime, Utc};

use crate::data_model::{DataPoint, DataValue, Symbol};
use crate::point_source::PointSource;

/// Packages consecutive points sharing an `end_time` into a single
/// `DataValue::Collection` keyed by the universe symbol. Used by coarse/ETF-constituent and custom
/// universe subscriptions, whose polled snapshot delivers many per-symbol
/// points for the same instant in one poll cycle.
///
/// A batch is flushed either when a point with a strictly later `end_time`
/// arrives, or when the upstream reports `is_finished()` (a one-shot
/// snapshot read, with no further point ever coming to signal the batch is
/// complete). A plain "no data right now" from a still-live upstream does
/// *not* flush — the batch for one instant may still be arriving across
/// several poll cycles of the underlying producer.
pub struct AggregateToCollection {
    upstream: Box<dyn PointSource>,
    universe_symbol: Symbol,
    buffer: Vec<DataPoint>,
    buffer_end_time: Option<DateTime<Utc>>,
    current: Option<DataPoint>,
}

impl AggregateToCollection {
    pub fn new(upstream: Box<dyn PointSource>, universe_symbol: impl Into<Symbol>) -> Self {
        AggregateToCollection {
            upstream,
            universe_symbol: universe_symbol.into(),
            buffer: Vec::new(),
            buffer_end_time: None,
            current: None,
        }
    }

    fn flush(&mut self, carry_over: Option<DataPoint>) {
        let end_time = self.buffer_end_time.take().unwrap();
        let start_time = self.buffer.iter().map(|p| p.start_time).min().unwrap_or(end_time);
        let points = std::mem::take(&mut self.buffer);
        self.current = Some(DataPoint::new(self.universe_symbol.clone(), start_time, end_time, DataValue::Collection(points)));
        if let Some(point) = carry_over {
            self.buffer_end_time = Some(point.end_time);
            self.buffer.push(point);
        }
    }
}

impl PointSource for AggregateToCollection {
    fn move_next(&mut self) -> bool {
        loop {
            if !self.upstream.move_next() {
                if self.upstream.is_finished() && !self.buffer.is_empty() {
                    self.flush(None);
                    return true;
                }
                return false;
            }
            let point = self.upstream.current().cloned().expect("move_next returned true");
            match self.buffer_end_time {
                None => {
                    self.buffer_end_time = Some(point.end_time);
                    self.buffer.push(point);
                }
                Some(current_end) if current_end == point.end_time => {
                    self.buffer.push(point);
                }
                Some(_) => {
                    self.flush(Some(point));
                    return true;
                }
            }
        }
    }

    fn current(&self) -> Option<&DataPoint> {
        self.current.as_ref()
    }

    fn is_finished(&self) -> bool {
        self.upstream.is_finished() && self.buffer.is_empty()
    }

    fn dispose(&mut self) {
        self.upstream.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point_source::VecSource;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn trade(symbol: &str, at: DateTime<Utc>) -> DataPoint {
        DataPoint::new(symbol, at, at, DataValue::Trade { price: dec!(1), volume: dec!(1) })
    }

    #[test]
    fn batches_same_end_time_then_flushes_on_new_instant() {
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::days(1);
        let upstream = VecSource::new(vec![
            trade("AAPL", t0),
            trade("MSFT", t0),
            trade("GOOG", t1),
        ]);
        let mut agg = AggregateToCollection::new(Box::new(upstream), "coarse-universe");

        assert!(agg.move_next());
        let first = agg.current().unwrap();
        assert_eq!(first.end_time, t0);
        match &first.value {
            DataValue::Collection(points) => assert_eq!(points.len(), 2),
            _ => panic!("expected collection"),
        }

        assert!(!agg.move_next(), "second batch still waiting on more points at t1");
    }
}
