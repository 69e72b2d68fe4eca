use crate::data_model::DataPoint;
use crate::point_source::PointSource;

/// Merges a main stream with N auxiliary streams (splits, dividends,
/// delistings) ordered by `end_time`; on a tie, an auxiliary event is
/// emitted before the main point for the same instant, so corporate actions
/// take effect on the bar where they apply.
pub struct AuxiliarySync {
    main: Box<dyn PointSource>,
    aux: Vec<Box<dyn PointSource>>,
    main_staged: Option<DataPoint>,
    aux_staged: Vec<Option<DataPoint>>,
    current: Option<DataPoint>,
}

impl AuxiliarySync {
    pub fn new(main: Box<dyn PointSource>, aux: Vec<Box<dyn PointSource>>) -> Self {
        let aux_staged = vec![None; aux.len()];
        AuxiliarySync { main, aux, main_staged: None, aux_staged, current: None }
    }

    fn earliest_aux(&self) -> Option<usize> {
        self.aux_staged
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|p| (i, p.end_time)))
            .min_by_key(|(_, end_time)| *end_time)
            .map(|(i, _)| i)
    }
}

impl PointSource for AuxiliarySync {
    fn move_next(&mut self) -> bool {
        if self.main_staged.is_none() && self.main.move_next() {
            self.main_staged = self.main.current().cloned();
        }
        for (slot, source) in self.aux_staged.iter_mut().zip(self.aux.iter_mut()) {
            if slot.is_none() && source.move_next() {
                *slot = source.current().cloned();
            }
        }

        match (self.earliest_aux(), &self.main_staged) {
            (Some(aux_index), Some(main_point)) => {
                let aux_end_time = self.aux_staged[aux_index].as_ref().unwrap().end_time;
                if aux_end_time <= main_point.end_time {
                    self.current = self.aux_staged[aux_index].take();
                } else {
                    self.current = self.main_staged.take();
                }
                true
            }
            (Some(aux_index), None) => {
                self.current = self.aux_staged[aux_index].take();
                true
            }
            (None, Some(_)) => {
                self.current = self.main_staged.take();
                true
            }
            (None, None) => {
                self.current = None;
                false
            }
        }
    }

    fn current(&self) -> Option<&DataPoint> {
        self.current.as_ref()
    }

    fn is_finished(&self) -> bool {
        self.main_staged.is_none()
            && self.aux_staged.iter().all(Option::is_none)
            && self.main.is_finished()
            && self.aux.iter().all(|a| a.is_finished())
    }

    fn dispose(&mut self) {
        self.main.dispose();
        for a in self.aux.iter_mut() {
            a.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::{AuxiliaryEvent, DataValue};
    use crate::point_source::VecSource;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn aux_event_precedes_main_point_on_tie() {
        let bar_time = Utc.with_ymd_and_hms(2020, 8, 31, 9, 30, 0).unwrap();
        let trade = DataPoint::new("AAPL", bar_time, bar_time, DataValue::Trade { price: dec!(500), volume: dec!(1) });
        let split = DataPoint::new(
            "AAPL",
            bar_time,
            bar_time,
            DataValue::Auxiliary(AuxiliaryEvent::Split { factor_numerator: 1, factor_denominator: 4 }),
        );

        let main = VecSource::new(vec![trade]);
        let aux = VecSource::new(vec![split]);
        let mut sync = AuxiliarySync::new(Box::new(main), vec![Box::new(aux)]);

        assert!(sync.move_next());
        assert!(matches!(sync.current().unwrap().value, DataValue::Auxiliary(_)));
        assert!(sync.move_next());
        assert!(matches!(sync.current().unwrap().value, DataValue::Trade { .. }));
        assert!(!sync.move_next());
    }
}
