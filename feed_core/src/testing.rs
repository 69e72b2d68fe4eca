//! In-memory fakes for every external trait in [`crate::external`]: a test
//! double that answers with fixed or caller-fed data, standing in for a
//! real vendor adapter. Gated behind the `testing` feature so it never
//! ships in a production dependency graph by accident.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::data_model::*;
use crate::error::{ProducerError, WarmupSourceError};
use crate::external::*;
use crate::factory::CustomDataSourceFactory;
use crate::point_source::{BoxedSource, VecSource};
use crate::queue::{bounded_queue, QueueProducer, DEFAULT_CAPACITY};
use crate::time::ManualClock;

/// Push-driven fake queue handler. `subscribe()` opens a bridge the same
/// way a real producer's callback thread would via
/// `crate::queue::bounded_queue`; tests call [`FakeQueueHandler::push`]
/// afterwards to drive it, rather than this crate polling a real socket.
#[derive(Default)]
pub struct FakeQueueHandler {
    producers: Mutex<HashMap<SubscriptionConfiguration, QueueProducer>>,
    universe_provider: Mutex<Option<Arc<dyn UniverseProvider>>>,
}

impl FakeQueueHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_universe_provider(provider: Arc<dyn UniverseProvider>) -> Self {
        FakeQueueHandler { producers: Mutex::new(HashMap::new()), universe_provider: Mutex::new(Some(provider)) }
    }

    /// Delivers `point` to the bridge registered for `config`. A no-op if
    /// nothing has subscribed to `config` yet, or if it has since been
    /// unsubscribed.
    pub fn push(&self, config: &SubscriptionConfiguration, point: DataPoint) {
        if let Some(producer) = self.producers.lock().expect("poisoned").get(config) {
            producer.enqueue(point);
        }
    }

    pub fn is_subscribed(&self, config: &SubscriptionConfiguration) -> bool {
        self.producers.lock().expect("poisoned").contains_key(config)
    }
}

#[async_trait]
impl QueueHandler for FakeQueueHandler {
    async fn subscribe(&self, config: &SubscriptionConfiguration, notifier: NewDataNotifier) -> Result<BoxedSource, ProducerError> {
        let (producer, consumer) = bounded_queue(DEFAULT_CAPACITY, Some(Arc::new(move || notifier())));
        self.producers.lock().expect("poisoned").insert(config.clone(), producer);
        Ok(Box::new(consumer))
    }

    async fn unsubscribe(&self, config: &SubscriptionConfiguration) {
        if let Some(producer) = self.producers.lock().expect("poisoned").remove(config) {
            producer.stop();
        }
    }

    fn universe_for(&self, _security_type: SecurityType) -> Option<Arc<dyn UniverseProvider>> {
        self.universe_provider.lock().expect("poisoned").clone()
    }
}

/// Returns whatever points were seeded via [`FakeHistoryProvider::seed`] for
/// a request's configuration, ignoring the requested window — tests control
/// exactly what "history" looks like rather than this fake reimplementing
/// date filtering.
#[derive(Default)]
pub struct FakeHistoryProvider {
    seeded: Mutex<HashMap<SubscriptionConfiguration, Vec<DataPoint>>>,
}

impl FakeHistoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, config: SubscriptionConfiguration, points: Vec<DataPoint>) {
        self.seeded.lock().expect("poisoned").insert(config, points);
    }
}

#[async_trait]
impl HistoryProvider for FakeHistoryProvider {
    async fn get_history(&self, requests: &[SubscriptionRequest], _algo_time_zone: Tz) -> Result<BoxedSource, WarmupSourceError> {
        let seeded = self.seeded.lock().expect("poisoned");
        let mut points = Vec::new();
        for request in requests {
            if let Some(history) = seeded.get(&request.configuration) {
                points.extend(history.iter().cloned());
            }
        }
        Ok(Box::new(VecSource::new(points)))
    }
}

/// Same idea as [`FakeHistoryProvider`], for the file-based warmup branch
///.
#[derive(Default)]
pub struct FakeHistoricalFeedFactory {
    seeded: Mutex<HashMap<SubscriptionConfiguration, Vec<DataPoint>>>,
}

impl FakeHistoricalFeedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, config: SubscriptionConfiguration, points: Vec<DataPoint>) {
        self.seeded.lock().expect("poisoned").insert(config, points);
    }
}

#[async_trait]
impl HistoricalFeedFactory for FakeHistoricalFeedFactory {
    async fn open(&self, request: &SubscriptionRequest) -> Result<BoxedSource, WarmupSourceError> {
        let points = self.seeded.lock().expect("poisoned").get(&request.configuration).cloned().unwrap_or_default();
        Ok(Box::new(VecSource::new(points)))
    }
}

/// Registers one polled source per call; a second `open()` for the same
/// configuration replays the same seeded points again from the start,
/// matching how a real custom-data factory would reopen a fresh cursor.
#[derive(Default)]
pub struct FakeCustomDataSourceFactory {
    seeded: Mutex<HashMap<SubscriptionConfiguration, Vec<DataPoint>>>,
}

impl FakeCustomDataSourceFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, config: SubscriptionConfiguration, points: Vec<DataPoint>) {
        self.seeded.lock().expect("poisoned").insert(config, points);
    }
}

#[async_trait]
impl CustomDataSourceFactory for FakeCustomDataSourceFactory {
    async fn open(&self, config: &SubscriptionConfiguration, _start_utc: DateTime<Utc>) -> Result<BoxedSource, ProducerError> {
        let points = self.seeded.lock().expect("poisoned").get(config).cloned().unwrap_or_default();
        Ok(Box::new(VecSource::new(points)))
    }
}

/// `true`/`false` per security type, configurable per test rather than
/// hardwired — equity feeds usually stream, custom/coarse-universe feeds
/// usually poll.
pub struct FakeChannelProvider {
    streamed_types: Mutex<Vec<SecurityType>>,
}

impl FakeChannelProvider {
    pub fn new(streamed_types: Vec<SecurityType>) -> Self {
        FakeChannelProvider { streamed_types: Mutex::new(streamed_types) }
    }

    pub fn streaming() -> Self {
        FakeChannelProvider::new(vec![SecurityType::Equity, SecurityType::Forex, SecurityType::Crypto, SecurityType::Future, SecurityType::Option, SecurityType::Cfd, SecurityType::Index])
    }

    pub fn polling() -> Self {
        FakeChannelProvider::new(vec![])
    }
}

impl ChannelProvider for FakeChannelProvider {
    fn should_stream(&self, config: &SubscriptionConfiguration) -> bool {
        self.streamed_types.lock().expect("poisoned").contains(&config.security_type)
    }
}

/// Resolves a caller-seeded [`MapFile`] per configuration; `None` (not
/// delisted) when nothing was seeded.
#[derive(Default)]
pub struct FakeMapFileProvider {
    seeded: Mutex<HashMap<SubscriptionConfiguration, MapFile>>,
}

impl FakeMapFileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, config: SubscriptionConfiguration, map_file: MapFile) {
        self.seeded.lock().expect("poisoned").insert(config, map_file);
    }
}

#[async_trait]
impl MapFileProvider for FakeMapFileProvider {
    async fn resolve(&self, config: &SubscriptionConfiguration) -> Option<MapFile> {
        self.seeded.lock().expect("poisoned").get(config).cloned()
    }
}

/// A factor file with one flat ratio, applied at every instant — enough to
/// exercise the price-scale adjuster without
/// modeling a real corporate-actions timeline.
pub struct FlatFactorFile {
    pub factor: rust_decimal::Decimal,
}

impl FactorFile for FlatFactorFile {
    fn factor_at(&self, _time: DateTime<Utc>) -> rust_decimal::Decimal {
        self.factor
    }
}

/// A factor file with one step change, for exercising a corporate action
/// mid-stream: `before` applies strictly before
/// `effective_at`, `after` applies at or after it.
pub struct SteppedFactorFile {
    pub effective_at: DateTime<Utc>,
    pub before: rust_decimal::Decimal,
    pub after: rust_decimal::Decimal,
}

impl FactorFile for SteppedFactorFile {
    fn factor_at(&self, time: DateTime<Utc>) -> rust_decimal::Decimal {
        if time < self.effective_at {
            self.before
        } else {
            self.after
        }
    }
}

#[derive(Default)]
pub struct FakeFactorFileProvider {
    seeded: Mutex<HashMap<SubscriptionConfiguration, Arc<dyn FactorFile>>>,
}

impl FakeFactorFileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, config: SubscriptionConfiguration, factor_file: Arc<dyn FactorFile>) {
        self.seeded.lock().expect("poisoned").insert(config, factor_file);
    }
}

#[async_trait]
impl FactorFileProvider for FakeFactorFileProvider {
    async fn resolve(&self, config: &SubscriptionConfiguration) -> Option<Arc<dyn FactorFile>> {
        self.seeded.lock().expect("poisoned").get(config).cloned()
    }
}

/// Fixed contract lists per underlying, for the option-chain/futures-chain
/// universe branches.
#[derive(Default)]
pub struct FakeUniverseProvider {
    option_contracts: Mutex<HashMap<Symbol, Vec<Symbol>>>,
    futures_contracts: Mutex<HashMap<Symbol, Vec<Symbol>>>,
}

impl FakeUniverseProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_option_chain(&self, underlying: impl Into<Symbol>, contracts: Vec<Symbol>) {
        self.option_contracts.lock().expect("poisoned").insert(underlying.into(), contracts);
    }

    pub fn seed_futures_chain(&self, underlying: impl Into<Symbol>, contracts: Vec<Symbol>) {
        self.futures_contracts.lock().expect("poisoned").insert(underlying.into(), contracts);
    }
}

impl UniverseProvider for FakeUniverseProvider {
    fn option_chain_contracts(&self, underlying: &Symbol, _as_of: DateTime<Utc>) -> Vec<Symbol> {
        self.option_contracts.lock().expect("poisoned").get(underlying).cloned().unwrap_or_default()
    }

    fn futures_chain_contracts(&self, underlying: &Symbol, _as_of: DateTime<Utc>) -> Vec<Symbol> {
        self.futures_contracts.lock().expect("poisoned").get(underlying).cloned().unwrap_or_default()
    }
}

/// `Algorithm` backed by a [`ManualClock`] so a test can drive "now" and
/// warmup state deterministically, carrying both a mode flag and a time
/// source the way a real strategy object does.
pub struct FakeAlgorithm {
    pub clock: Arc<ManualClock>,
    pub warming_up: std::sync::atomic::AtomicBool,
    pub history_provider: Arc<dyn HistoryProvider>,
    pub time_zone: Tz,
}

impl FakeAlgorithm {
    pub fn new(clock: Arc<ManualClock>, history_provider: Arc<dyn HistoryProvider>, time_zone: Tz) -> Self {
        FakeAlgorithm { clock, warming_up: std::sync::atomic::AtomicBool::new(false), history_provider, time_zone }
    }

    pub fn set_warming_up(&self, warming_up: bool) {
        self.warming_up.store(warming_up, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Algorithm for FakeAlgorithm {
    fn is_warming_up(&self) -> bool {
        self.warming_up.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn history_provider(&self) -> Arc<dyn HistoryProvider> {
        self.history_provider.clone()
    }

    fn time_zone(&self) -> Tz {
        self.time_zone
    }
}
