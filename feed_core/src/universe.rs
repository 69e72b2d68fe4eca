//! Universe-subscription branches. Each branch builds a complete
//! `BoxedSource` already terminated in a frontier-aware gate, bypassing the
//! main data-subscription transformer chain entirely — universe selection
//! has its own shape, not a price/fill-forward/hours chain.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::data_model::{DataPoint, DataValue, Symbol};
use crate::point_source::PointSource;
use crate::point_source::BoxedSource;
use crate::time::{PredicateGatedClock, TimeProvider};
use crate::transformers::{AggregateToCollection, FrontierGate, MergeOrdered};

/// Spoofs selection-interval ticks in the configuration's data time zone
///. Driven by wall-clock time
/// rather than a replayable sequence since a universe trigger has no
/// upstream producer of its own — polled by C4 like any other custom data
/// source.
pub struct SelectionTickGenerator {
    clock: Arc<dyn TimeProvider>,
    interval: chrono::Duration,
    symbol: Symbol,
    next_boundary: DateTime<Utc>,
    current: Option<DataPoint>,
}

impl SelectionTickGenerator {
    pub fn new(clock: Arc<dyn TimeProvider>, interval: chrono::Duration, symbol: impl Into<Symbol>) -> Self {
        let first_boundary = clock.now_utc() + interval;
        SelectionTickGenerator { clock, interval, symbol: symbol.into(), next_boundary: first_boundary, current: None }
    }
}

impl PointSource for SelectionTickGenerator {
    fn move_next(&mut self) -> bool {
        let now = self.clock.now_utc();
        if now < self.next_boundary {
            return false;
        }
        let end = self.next_boundary;
        self.current = Some(DataPoint::new(self.symbol.clone(), end - self.interval, end, DataValue::Collection(Vec::new())));
        self.next_boundary = end + self.interval;
        true
    }

    fn current(&self) -> Option<&DataPoint> {
        self.current.as_ref()
    }
}

/// Spoofs selection-interval ticks, gated by the frontier clock.
/// `eligible_hours` is the caller-supplied predicate restricting selection
/// to the hours the universe should actually be refreshed in.
pub fn time_triggered(
    clock: Arc<dyn TimeProvider>,
    frontier: Arc<dyn TimeProvider>,
    interval: chrono::Duration,
    universe_symbol: impl Into<Symbol>,
    eligible_hours: impl Fn(DateTime<Utc>) -> bool + Send + Sync + 'static,
) -> BoxedSource {
    let generator = SelectionTickGenerator::new(clock, interval, universe_symbol);
    let gated_frontier = Arc::new(PredicateGatedClock::new(frontier_as_concrete(frontier), eligible_hours));
    Box::new(FrontierGate::new(Box::new(generator), gated_frontier))
}

/// Coarse universe / ETF-constituent branch: a polled daily
/// snapshot, already adjusted by the caller to the previous tradable day,
/// aggregated into one `Collection` point and wrapped in a predicate-gated
/// frontier so selection cannot fire during illegal hours.
pub fn coarse_or_etf_constituent(
    snapshot_source: BoxedSource,
    universe_symbol: impl Into<Symbol>,
    frontier: Arc<dyn TimeProvider>,
    eligible_hours: impl Fn(DateTime<Utc>) -> bool + Send + Sync + 'static,
) -> BoxedSource {
    let aggregated = AggregateToCollection::new(snapshot_source, universe_symbol);
    let gated_frontier = Arc::new(PredicateGatedClock::new(frontier_as_concrete(frontier), eligible_hours));
    Box::new(FrontierGate::new(Box::new(aggregated), gated_frontier))
}

/// Option-chain branch: `per_contract` subscribes and
/// fill-forwards one contract symbol; `contracts` enumerates the chain via
/// the universe provider. All contract streams are merged by `end_time` and
/// terminated in an ungated frontier gate.
pub fn option_chain(
    contracts: Vec<Symbol>,
    per_contract: impl Fn(&Symbol) -> BoxedSource,
    frontier: Arc<dyn TimeProvider>,
) -> BoxedSource {
    let sources: Vec<BoxedSource> = contracts.iter().map(|symbol| per_contract(symbol)).collect();
    Box::new(FrontierGate::new(Box::new(MergeOrdered::new(sources)), frontier))
}

/// Futures-chain branch: same pattern, without fill-forward
/// (`per_contract` here does not wrap `FillForward`, unlike the option-chain
/// caller).
pub fn futures_chain(
    contracts: Vec<Symbol>,
    per_contract: impl Fn(&Symbol) -> BoxedSource,
    frontier: Arc<dyn TimeProvider>,
) -> BoxedSource {
    option_chain(contracts, per_contract, frontier)
}

/// Custom universe branch: polled custom data, aggregated into a collection,
/// delivered via C4, terminated in a frontier gate.
pub fn custom(source: BoxedSource, universe_symbol: impl Into<Symbol>, frontier: Arc<dyn TimeProvider>) -> BoxedSource {
    let aggregated = AggregateToCollection::new(source, universe_symbol);
    Box::new(FrontierGate::new(Box::new(aggregated), frontier))
}

/// `PredicateGatedClock<P>` is generic over its inner provider; callers in
/// this module only ever have a type-erased `Arc<dyn TimeProvider>`, so wrap
/// once here rather than push the generic through every branch signature.
fn frontier_as_concrete(frontier: Arc<dyn TimeProvider>) -> Arc<ErasedTimeProvider> {
    Arc::new(ErasedTimeProvider(frontier))
}

pub struct ErasedTimeProvider(Arc<dyn TimeProvider>);

impl TimeProvider for ErasedTimeProvider {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0.now_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;
    use chrono::{Duration, TimeZone, Timelike, Weekday};

    #[test]
    fn tick_generator_fires_only_once_boundary_reached() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let mut generator = SelectionTickGenerator::new(clock.clone(), Duration::hours(1), "coarse-universe");
        assert!(!generator.move_next());
        clock.advance(Duration::hours(1));
        assert!(generator.move_next());
        assert!(!generator.move_next());
    }

    #[test]
    fn coarse_universe_withheld_outside_eligible_hours() {
        let start = Utc.with_ymd_and_hms(2024, 1, 6, 1, 0, 0).unwrap(); // Saturday 01:00 UTC
        let clock = Arc::new(ManualClock::new(start));
        let snapshot = crate::point_source::VecSource::new(vec![DataPoint::new(
            "AAPL",
            start,
            start,
            DataValue::Trade { price: Default::default(), volume: Default::default() },
        )]);

        let mut source = coarse_or_etf_constituent(Box::new(snapshot), "coarse-universe", clock.clone(), |time| {
            let hour = time.hour();
            hour > 5 && hour < 23 && time.weekday() != Weekday::Sat
        });

        // Saturday 1am is outside the eligible window; the gate withholds
        // the aggregated point even though it is upstream-ready.
        assert!(!source.move_next());
    }
}
