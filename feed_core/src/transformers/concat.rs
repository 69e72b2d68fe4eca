use std::collections::VecDeque;

use crate::data_model::DataPoint;
use crate::point_source::PointSource;

/// Drains sources left to right, disposing each as it is exhausted except
/// the last, which is kept and continues to drive the stream once reached
///. Used to splice warmup replay in front of the live
/// tail: once the live stage is the sole remaining entry, concat never
/// reverts to a prior stage even if the live stage momentarily reports "no
/// data right now".
pub struct Concat {
    stages: VecDeque<Box<dyn PointSource>>,
    current: Option<DataPoint>,
}

impl Concat {
    pub fn new(stages: Vec<Box<dyn PointSource>>) -> Self {
        Concat { stages: stages.into(), current: None }
    }
}

impl PointSource for Concat {
    fn move_next(&mut self) -> bool {
        loop {
            let is_last = self.stages.len() <= 1;
            let Some(stage) = self.stages.front_mut() else {
                self.current = None;
                return false;
            };
            if stage.move_next() {
                self.current = stage.current().cloned();
                return true;
            }
            if is_last || !stage.is_finished() {
                self.current = None;
                return false;
            }
            // Non-terminal stage finished: dispose and advance to the next.
            let mut finished = self.stages.pop_front().expect("front checked above");
            finished.dispose();
        }
    }

    fn current(&self) -> Option<&DataPoint> {
        self.current.as_ref()
    }

    fn is_finished(&self) -> bool {
        self.stages.len() <= 1 && self.stages.front().map_or(true, |s| s.is_finished())
    }

    fn dispose(&mut self) {
        for stage in self.stages.iter_mut() {
            stage.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::DataValue;
    use crate::point_source::VecSource;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn point(symbol: &str) -> DataPoint {
        let now = Utc::now();
        DataPoint::new(symbol, now, now, DataValue::Trade { price: dec!(1), volume: dec!(1) })
    }

    #[test]
    fn drains_warmup_then_never_reverts_once_live_is_reached() {
        let warmup = VecSource::new(vec![point("warmup-1"), point("warmup-2")]);
        let live = VecSource::new(vec![point("live-1")]);
        let mut concat = Concat::new(vec![Box::new(warmup), Box::new(live)]);

        assert!(concat.move_next());
        assert_eq!(concat.current().unwrap().symbol, "warmup-1");
        assert!(concat.move_next());
        assert_eq!(concat.current().unwrap().symbol, "warmup-2");
        assert!(concat.move_next());
        assert_eq!(concat.current().unwrap().symbol, "live-1");

        // Live stage exhausted for now ("no data right now"), never reverts
        // to the already-disposed warmup stage.
        assert!(!concat.move_next());
        assert!(!concat.move_next());
    }
}
