use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::data_model::DataPoint;
use crate::point_source::PointSource;

/// First transformer in the pipeline: multiplies price
/// fields by the factor evaluated at `point.end_time`, so anything
/// downstream — fill-forward in particular — only ever sees scaled prices.
/// No effect on non-price payloads.
///
/// Takes the factor lookup as a closure rather than the `FactorFileProvider`
/// trait directly: the factory (C6) resolves the provider once per
/// subscription and hands this transformer a bound closure, keeping the
/// transformer itself free of any external-trait object-safety concerns.
pub struct PriceScaleAdjuster {
    upstream: Box<dyn PointSource>,
    factor_at: Arc<dyn Fn(DateTime<Utc>) -> Decimal + Send + Sync>,
    current: Option<DataPoint>,
}

impl PriceScaleAdjuster {
    pub fn new(
        upstream: Box<dyn PointSource>,
        factor_at: Arc<dyn Fn(DateTime<Utc>) -> Decimal + Send + Sync>,
    ) -> Self {
        PriceScaleAdjuster { upstream, factor_at, current: None }
    }
}

impl PointSource for PriceScaleAdjuster {
    fn move_next(&mut self) -> bool {
        if !self.upstream.move_next() {
            self.current = None;
            return false;
        }
        let mut point = self.upstream.current().cloned().expect("move_next returned true");
        let factor = (self.factor_at)(point.end_time);
        point.value.scale_price(factor);
        self.current = Some(point);
        true
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
