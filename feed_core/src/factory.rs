//! Subscription factory. Assembles the per-request pipeline, wiring the
//! queue bridge, transformer chain, and queue-handler adapter in the fixed
//! required order, and attaches the warmup prefix in front of the live
//! tail.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::warn;

use crate::custom_data_exchange::CustomDataExchange;
use crate::data_model::{SecurityType, SubscriptionConfiguration, SubscriptionRequest, UniverseKind};
use crate::error::{ProducerError, SubscriptionConstructionError, UnsupportedSecurityType};
use crate::external::{
    Algorithm, ChannelProvider, FactorFileProvider, HistoricalFeedFactory, MapFileProvider, NewDataNotifier, QueueHandler,
};
use crate::point_source::{BoxedSource, VecSource};
use crate::queue_handler_adapter::QueueHandlerAdapter;
use crate::subscription::Subscription;
use crate::time::TimeProvider;
use crate::transformers::{FillForward, FrontierGate, MarketHoursFilter, PriceScaleAdjuster};
use crate::warmup::WarmupPlanner;

/// A custom/polled data source, external by contract.
/// The returned source handles its own refresh cadence internally; the
/// factory only opens it once and registers it with the custom-data
/// exchange.
#[async_trait::async_trait]
pub trait CustomDataSourceFactory: Send + Sync {
    async fn open(&self, config: &SubscriptionConfiguration, start_utc: DateTime<Utc>) -> Result<BoxedSource, ProducerError>;
}

/// Resolved per-request construction outcome. Callers need to tell
/// "failed" apart from "intentionally skipped because the symbol is
/// expired"; this type answers that by giving each its own variant rather
/// than collapsing both to `None` (decision recorded in `DESIGN.md`).
pub enum SubscriptionOutcome {
    Created(Subscription),
    /// The symbol was delisted before today; the live branch was bypassed
    /// but the subscription is still usable (warmup may still have data).
    Expired(Subscription),
    Failed(SubscriptionConstructionError),
}

pub struct SubscriptionFactory<Q: QueueHandler> {
    queue_adapter: Arc<QueueHandlerAdapter<Q>>,
    channel_provider: Arc<dyn ChannelProvider>,
    map_file_provider: Arc<dyn MapFileProvider>,
    factor_file_provider: Arc<dyn FactorFileProvider>,
    historical_feed_factory: Arc<dyn HistoricalFeedFactory>,
    custom_data_factory: Arc<dyn CustomDataSourceFactory>,
    custom_data_exchange: Arc<CustomDataExchange>,
    frontier: Arc<dyn TimeProvider>,
    warmup_planner: WarmupPlanner,
    /// The feed's own subscription set, shared (not owned) so notifiers
    /// built here can look a `Subscription` up by configuration once it
    /// exists, instead of holding a direct reference to one that does not
    /// exist yet while the pipeline is still being assembled.
    subscriptions: Arc<DashMap<SubscriptionConfiguration, Subscription>>,
}

impl<Q: QueueHandler + 'static> SubscriptionFactory<Q> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue_adapter: Arc<QueueHandlerAdapter<Q>>,
        channel_provider: Arc<dyn ChannelProvider>,
        map_file_provider: Arc<dyn MapFileProvider>,
        factor_file_provider: Arc<dyn FactorFileProvider>,
        historical_feed_factory: Arc<dyn HistoricalFeedFactory>,
        custom_data_factory: Arc<dyn CustomDataSourceFactory>,
        custom_data_exchange: Arc<CustomDataExchange>,
        frontier: Arc<dyn TimeProvider>,
        warmup_planner: WarmupPlanner,
        subscriptions: Arc<DashMap<SubscriptionConfiguration, Subscription>>,
    ) -> Self {
        SubscriptionFactory {
            queue_adapter,
            channel_provider,
            map_file_provider,
            factor_file_provider,
            historical_feed_factory,
            custom_data_factory,
            custom_data_exchange,
            frontier,
            warmup_planner,
            subscriptions,
        }
    }

    /// Builds a notifier closure for `configuration`: a lookup key into the
    /// feed's subscription set, fired by the producer (C2 bridge or C5
    /// handler) whenever new data lands, never a direct reference to the
    /// `Subscription` that owns the wake callback (§9).
    fn wake_notifier(&self, configuration: SubscriptionConfiguration) -> NewDataNotifier {
        let subscriptions = self.subscriptions.clone();
        Arc::new(move || {
            if let Some(subscription) = subscriptions.get(&configuration) {
                subscription.notify();
            }
        })
    }

    pub async fn create(&self, request: SubscriptionRequest, algorithm: &dyn Algorithm) -> SubscriptionOutcome {
        if request.is_universe_subscription {
            if let Some((_, kind)) = &request.universe {
                if matches!(kind, UniverseKind::OptionChain | UniverseKind::FuturesChain)
                    && !self.queue_adapter.universe_capable(request.configuration.security_type)
                {
                    return SubscriptionOutcome::Failed(SubscriptionConstructionError {
                        configuration: request.configuration.clone(),
                        reason: UnsupportedSecurityType { configuration: request.configuration.clone() }.to_string(),
                    });
                }
            }
        }

        match self.try_create(request, algorithm).await {
            Ok(outcome) => outcome,
            Err(reason) => SubscriptionOutcome::Failed(reason),
        }
    }

    async fn try_create(
        &self,
        request: SubscriptionRequest,
        algorithm: &dyn Algorithm,
    ) -> Result<SubscriptionOutcome, SubscriptionConstructionError> {
        let configuration = request.configuration.clone();
        let now_utc = self.frontier.now_utc();
        let notifier = self.wake_notifier(configuration.clone());

        // Step 1: expiry check.
        let expired = self.is_expired(&configuration, now_utc).await;

        let live: BoxedSource = if expired {
            Box::new(VecSource::empty())
        } else if request.is_universe_subscription {
            self.build_universe_live(&request, notifier).await.map_err(|reason| SubscriptionConstructionError {
                configuration: configuration.clone(),
                reason,
            })?
        } else {
            self.build_data_live(&request, notifier).await.map_err(|reason| SubscriptionConstructionError {
                configuration: configuration.clone(),
                reason,
            })?
        };

        // Step 4: warmup prefix, only while the algorithm is warming up.
        let staged = if algorithm.is_warming_up() {
            let history_provider = algorithm.history_provider();
            self.warmup_planner
                .build(
                    &request,
                    now_utc,
                    algorithm.time_zone(),
                    self.historical_feed_factory.as_ref(),
                    history_provider.as_ref(),
                    live,
                )
                .await
        } else {
            live
        };

        let subscription = Subscription::new(configuration, staged);
        if expired {
            Ok(SubscriptionOutcome::Expired(subscription))
        } else {
            Ok(SubscriptionOutcome::Created(subscription))
        }
    }

    /// Registers `source` with the custom-data exchange (C4) and returns a
    /// pull source fed by its cooperative polling, bridged through a C2
    /// bounded queue — the same shape a streamed (C5) source has, so
    /// downstream transformers never need to know which producer fed them.
    /// `notifier` fires after every successful enqueue, waking the owning
    /// subscription the same way a streamed source's handler notifier does.
    fn register_polled(&self, symbol: String, source: BoxedSource, notifier: NewDataNotifier) -> BoxedSource {
        let (producer, consumer) = crate::queue::bounded_queue(crate::queue::DEFAULT_CAPACITY, Some(notifier));
        let stop_producer = producer.clone();
        self.custom_data_exchange.add(
            symbol,
            source,
            Arc::new(move |point| producer.enqueue(point)),
            Arc::new(move || stop_producer.stop()),
        );
        Box::new(consumer)
    }

    async fn is_expired(&self, configuration: &SubscriptionConfiguration, now_utc: DateTime<Utc>) -> bool {
        match self.map_file_provider.resolve(configuration).await {
            Some(map_file) => map_file.delisting_date_utc.map_or(false, |delisting| delisting.date_naive() < now_utc.date_naive()),
            None => false,
        }
    }

    /// Step 2/3 for a plain data subscription: branch on streaming
    /// capability, then compose the C3 chain in the mandatory order.
    async fn build_data_live(&self, request: &SubscriptionRequest, notifier: NewDataNotifier) -> Result<BoxedSource, String> {
        let configuration = &request.configuration;

        let raw: BoxedSource = if self.channel_provider.should_stream(configuration) {
            self.queue_adapter.subscribe(configuration, notifier).await.map_err(|err| err.to_string())?
        } else {
            let source = self.custom_data_factory.open(configuration, request.start_utc).await.map_err(|err| err.to_string())?;
            self.register_polled(configuration.symbol.clone(), source, notifier)
        };

        let mut chain = raw;

        if configuration.prices_should_be_scaled(true) {
            if let Some(factor_file) = self.factor_file_provider.resolve(configuration).await {
                chain = Box::new(PriceScaleAdjuster::new(chain, Arc::new(move |time| factor_file.factor_at(time))));
            } else {
                warn!("{:?}: no factor file resolved, proceeding unscaled", configuration);
            }
        }

        if configuration.fill_forward {
            chain = Box::new(FillForward::new(
                chain,
                configuration.resolution.as_duration(),
                request.security.trading_hours.clone(),
                configuration.extended_hours,
                request.end_utc,
            ));
        }

        if configuration.is_filtered_subscription() {
            chain = Box::new(MarketHoursFilter::new(chain, request.security.trading_hours.clone(), configuration.extended_hours));
        }

        Ok(Box::new(FrontierGate::new(chain, self.frontier.clone())))
    }

    /// Step 2 universe sub-cases. The custom/coarse/option/
    /// futures branches delegate to `crate::universe`; this method only
    /// resolves the security-type-specific dependencies (contract
    /// enumeration, snapshot sourcing) before calling them.
    async fn build_universe_live(&self, request: &SubscriptionRequest, notifier: NewDataNotifier) -> Result<BoxedSource, String> {
        let (_, kind) = request.universe.as_ref().ok_or_else(|| "universe subscription missing universe kind".to_string())?;
        let configuration = &request.configuration;

        match kind {
            UniverseKind::TimeTriggered { selection_interval } => Ok(crate::universe::time_triggered(
                self.frontier.clone(),
                self.frontier.clone(),
                *selection_interval,
                configuration.symbol.clone(),
                |time| {
                    use chrono::{Datelike, Timelike};
                    let hour = time.hour();
                    hour > 5 && hour < 23 && time.weekday() != chrono::Weekday::Sat
                },
            )),
            UniverseKind::Coarse | UniverseKind::EtfConstituent { .. } => {
                let snapshot = self.custom_data_factory.open(configuration, request.start_utc).await.map_err(|err| err.to_string())?;
                let polled = self.register_polled(configuration.symbol.clone(), snapshot, notifier);
                Ok(crate::universe::coarse_or_etf_constituent(
                    polled,
                    configuration.symbol.clone(),
                    self.frontier.clone(),
                    |time| {
                        use chrono::{Datelike, Timelike};
                        let hour = time.hour();
                        hour > 5 && hour < 23 && time.weekday() != chrono::Weekday::Sat
                    },
                ))
            }
            UniverseKind::OptionChain => {
                let provider = self
                    .queue_adapter
                    .handler()
                    .universe_for(SecurityType::Option)
                    .ok_or_else(|| "queue handler has no option universe provider".to_string())?;
                let contracts = provider.option_chain_contracts(&configuration.symbol, request.start_utc);
                let adapter = self.queue_adapter.clone();
                let hours = request.security.trading_hours.clone();
                let end_utc = request.end_utc;
                let extended_hours = configuration.extended_hours;
                let resolution = configuration.resolution;
                Ok(crate::universe::option_chain(
                    contracts,
                    move |symbol| {
                        build_contract_source(
                            adapter.clone(),
                            symbol,
                            SecurityType::Option,
                            resolution,
                            hours.clone(),
                            extended_hours,
                            end_utc,
                            true,
                            notifier.clone(),
                        )
                    },
                    self.frontier.clone(),
                ))
            }
            UniverseKind::FuturesChain => {
                let provider = self
                    .queue_adapter
                    .handler()
                    .universe_for(SecurityType::Future)
                    .ok_or_else(|| "queue handler has no futures universe provider".to_string())?;
                let contracts = provider.futures_chain_contracts(&configuration.symbol, request.start_utc);
                let adapter = self.queue_adapter.clone();
                let hours = request.security.trading_hours.clone();
                let end_utc = request.end_utc;
                let extended_hours = configuration.extended_hours;
                let resolution = configuration.resolution;
                Ok(crate::universe::futures_chain(
                    contracts,
                    move |symbol| {
                        build_contract_source(
                            adapter.clone(),
                            symbol,
                            SecurityType::Future,
                            resolution,
                            hours.clone(),
                            extended_hours,
                            end_utc,
                            false,
                            notifier.clone(),
                        )
                    },
                    self.frontier.clone(),
                ))
            }
            UniverseKind::Custom(_) => {
                let source = self.custom_data_factory.open(configuration, request.start_utc).await.map_err(|err| err.to_string())?;
                let polled = self.register_polled(configuration.symbol.clone(), source, notifier);
                Ok(crate::universe::custom(polled, configuration.symbol.clone(), self.frontier.clone()))
            }
        }
    }
}

/// Subscribes one chain contract and optionally wraps it in fill-forward —
/// the per-contract enumerator used by the option-chain branch. This
/// synchronous helper blocks only on an already-resolved `tokio` runtime,
/// keeping otherwise-synchronous construction code free of `async fn`.
#[allow(clippy::too_many_arguments)]
fn build_contract_source<Q: QueueHandler + 'static>(
    adapter: Arc<QueueHandlerAdapter<Q>>,
    symbol: &str,
    security_type: SecurityType,
    resolution: crate::data_model::Resolution,
    hours: Arc<crate::market_hours::TradingHours>,
    extended_hours: bool,
    end_utc: DateTime<Utc>,
    with_fill_forward: bool,
    notifier: NewDataNotifier,
) -> BoxedSource {
    let configuration = SubscriptionConfiguration {
        symbol: symbol.to_string(),
        security_type,
        data_type: crate::data_model::DataType::Trade,
        resolution,
        exchange_time_zone: hours.timezone,
        data_time_zone: hours.timezone,
        market_hours_schedule: symbol.to_string(),
        fill_forward: with_fill_forward,
        extended_hours,
        is_internal_feed: true,
        is_filtered: false,
    };
    let source = futures::executor::block_on(adapter.subscribe(&configuration, notifier))
        .unwrap_or_else(|_| Box::new(VecSource::empty()));
    if with_fill_forward {
        Box::new(FillForward::new(source, resolution.as_duration(), hours, extended_hours, end_utc))
    } else {
        source
    }
}
