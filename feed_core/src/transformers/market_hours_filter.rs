use std::sync::Arc;

use crate::data_model::DataPoint;
use crate::market_hours::TradingHours;
use crate::point_source::PointSource;

/// Third transformer in the pipeline. Drops points whose
/// `end_time` falls outside the security's tradable hours, honoring
/// `extended_hours`. Auxiliary events (splits, dividends, delistings) always
/// pass — a corporate action does not wait for the market to open.
pub struct MarketHoursFilter {
    upstream: Box<dyn PointSource>,
    hours: Arc<TradingHours>,
    extended_hours: bool,
    current: Option<DataPoint>,
}

impl MarketHoursFilter {
    pub fn new(upstream: Box<dyn PointSource>, hours: Arc<TradingHours>, extended_hours: bool) -> Self {
        MarketHoursFilter { upstream, hours, extended_hours, current: None }
    }
}

impl PointSource for MarketHoursFilter {
    fn move_next(&mut self) -> bool {
        loop {
            if !self.upstream.move_next() {
                self.current = None;
                return false;
            }
            let point = self.upstream.current().cloned().expect("move_next returned true");
            if point.value.is_auxiliary() || self.hours.is_market_open(point.end_time, self.extended_hours) {
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
    use crate::data_model::{AuxiliaryEvent, DataValue};
    use crate::market_hours::DaySession;
    use crate::point_source::VecSource;
    use chrono::{NaiveTime, TimeZone, Weekday};
    use chrono_tz::America::Chicago;
    use rust_decimal_macros::dec;

    fn hours() -> Arc<TradingHours> {
        let closed = DaySession::closed();
        let open = DaySession {
            open: Some(NaiveTime::from_hms_opt(8, 30, 0).unwrap()),
            close: Some(NaiveTime::from_hms_opt(16, 0, 0).unwrap()),
            extended_open: None,
            extended_close: None,
        };
        Arc::new(TradingHours {
            timezone: Chicago,
            sunday: closed.clone(),
            monday: open.clone(),
            tuesday: open.clone(),
            wednesday: open.clone(),
            thursday: open.clone(),
            friday: open,
            saturday: closed,
            week_start: Weekday::Sun,
        })
    }

    #[test]
    fn drops_points_outside_hours_but_keeps_auxiliary() {
        let overnight = Chicago.with_ymd_and_hms(2024, 1, 9, 2, 0, 0).unwrap().to_utc();
        let regular = Chicago.with_ymd_and_hms(2024, 1, 9, 9, 0, 0).unwrap().to_utc();
        let upstream = VecSource::new(vec![
            DataPoint::new("AAPL", overnight, overnight, DataValue::Trade { price: dec!(1), volume: dec!(1) }),
            DataPoint::new("AAPL", overnight, overnight, DataValue::Auxiliary(AuxiliaryEvent::Delisting)),
            DataPoint::new("AAPL", regular, regular, DataValue::Trade { price: dec!(1), volume: dec!(1) }),
        ]);
        let mut filter = MarketHoursFilter::new(Box::new(upstream), hours(), false);

        assert!(filter.move_next());
        assert!(matches!(filter.current().unwrap().value, DataValue::Auxiliary(_)));
        assert!(filter.move_next());
        assert_eq!(filter.current().unwrap().end_time, regular);
        assert!(!filter.move_next());
    }
}
