//! Feed lifecycle. Holds the subscription set in a `DashMap<Symbol, _>` —
//! lookup by key, not by returned ownership, since the slice loop pulls
//! through the feed rather than taking the iterator away from it.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::config::FeedConfig;
use crate::custom_data_exchange::CustomDataExchange;
use crate::data_model::{DataPoint, RequestContext, SubscriptionConfiguration, SubscriptionRequest};
use crate::error::{ConfigurationError, SubscriptionConstructionError};
use crate::external::{Algorithm, ChannelProvider, FactorFileProvider, HistoricalFeedFactory, MapFileProvider, QueueHandler};
use crate::factory::{CustomDataSourceFactory, SubscriptionFactory, SubscriptionOutcome};
use crate::queue_handler_adapter::QueueHandlerAdapter;
use crate::subscription::Subscription;
use crate::time::TimeProvider;
use crate::warmup::WarmupPlanner;

/// New → Initialized → Active → Stopping → Stopped.
/// `Initialized` and `Active` are collapsed into one transition here since
/// nothing observable happens between "queue handler resolved" and
/// "custom-data exchange started" — both are steps of the same
/// `initialize()` call, never independently visible to a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum FeedState {
    New = 0,
    Active = 1,
    Stopping = 2,
    Stopped = 3,
}

impl FeedState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => FeedState::New,
            1 => FeedState::Active,
            2 => FeedState::Stopping,
            _ => FeedState::Stopped,
        }
    }
}

/// Result of `create_subscription`, distinct from `SubscriptionOutcome`
/// returned by the factory: the feed retains ownership of the
/// `Subscription` itself (inserted into the subscription set), so callers
/// only learn *what happened*, then drain through `move_next`/`current`
/// keyed by configuration.
pub enum CreateOutcome {
    Created,
    /// Mirrors `SubscriptionOutcome::Expired` — the symbol is delisted but
    /// the subscription was still registered (its warmup tail may still
    /// have data).
    Expired,
    Failed(SubscriptionConstructionError),
}

/// Owns the subscription set and coordinates custom-data-exchange and
/// queue-handler start-stop. One per live job; the algorithm object, the
/// job descriptor, and config loading all live upstream of this crate.
pub struct FeedCore<Q: QueueHandler + 'static> {
    state: AtomicU8,
    factory: SubscriptionFactory<Q>,
    queue_adapter: Arc<QueueHandlerAdapter<Q>>,
    channel_provider: Arc<dyn ChannelProvider>,
    custom_data_exchange: Arc<CustomDataExchange>,
    /// Shared with `factory`: notifiers built at subscribe-time hold only a
    /// configuration key into this map, never a direct reference to the
    /// `Subscription` they wake (§9's weak-style wiring).
    subscriptions: Arc<DashMap<SubscriptionConfiguration, Subscription>>,
    config: FeedConfig,
}

impl<Q: QueueHandler + 'static> FeedCore<Q> {
    pub fn new(
        factory: SubscriptionFactory<Q>,
        queue_adapter: Arc<QueueHandlerAdapter<Q>>,
        channel_provider: Arc<dyn ChannelProvider>,
        custom_data_exchange: Arc<CustomDataExchange>,
        subscriptions: Arc<DashMap<SubscriptionConfiguration, Subscription>>,
    ) -> Self {
        Self::new_with_config(factory, queue_adapter, channel_provider, custom_data_exchange, subscriptions, FeedConfig::default())
    }

    pub fn new_with_config(
        factory: SubscriptionFactory<Q>,
        queue_adapter: Arc<QueueHandlerAdapter<Q>>,
        channel_provider: Arc<dyn ChannelProvider>,
        custom_data_exchange: Arc<CustomDataExchange>,
        subscriptions: Arc<DashMap<SubscriptionConfiguration, Subscription>>,
        config: FeedConfig,
    ) -> Self {
        FeedCore {
            state: AtomicU8::new(FeedState::New as u8),
            factory,
            queue_adapter,
            channel_provider,
            custom_data_exchange,
            subscriptions,
            config,
        }
    }

    /// Assembles every C2-C8 collaborator from `config` and the host's
    /// external-trait implementations in one call — the recognized options
    /// from §6 (`max-warmup-history-days-look-back`,
    /// `custom-exchange sleep_interval`) drive the custom-data exchange's
    /// poll cadence and the warmup planner's look-back bound;
    /// `tiingo-auth-token` is carried through opaquely for the host's own
    /// `CustomDataSourceFactory`/`QueueHandler` implementations to read back
    /// via [`FeedCore::auth_token`].
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        config: FeedConfig,
        queue_handler: Arc<Q>,
        channel_provider: Arc<dyn ChannelProvider>,
        map_file_provider: Arc<dyn MapFileProvider>,
        factor_file_provider: Arc<dyn FactorFileProvider>,
        historical_feed_factory: Arc<dyn HistoricalFeedFactory>,
        custom_data_factory: Arc<dyn CustomDataSourceFactory>,
        frontier: Arc<dyn TimeProvider>,
    ) -> Self {
        let queue_adapter = Arc::new(QueueHandlerAdapter::new(queue_handler));
        let custom_data_exchange = Arc::new(CustomDataExchange::new(config.custom_exchange_sleep_interval()));
        let warmup_planner = WarmupPlanner::new(config.max_warmup_look_back());
        let subscriptions = Arc::new(DashMap::new());
        let factory = SubscriptionFactory::new(
            queue_adapter.clone(),
            channel_provider.clone(),
            map_file_provider,
            factor_file_provider,
            historical_feed_factory,
            custom_data_factory,
            custom_data_exchange.clone(),
            frontier,
            warmup_planner,
            subscriptions.clone(),
        );
        Self::new_with_config(factory, queue_adapter, channel_provider, custom_data_exchange, subscriptions, config)
    }

    /// Opaque passthrough of the `tiingo-auth-token` configuration option
    /// (§6), for host-side `QueueHandler`/`CustomDataSourceFactory`
    /// implementations that need it — this crate never reads it itself.
    pub fn auth_token(&self) -> Option<&str> {
        self.config.tiingo_auth_token.as_deref()
    }

    fn state(&self) -> FeedState {
        FeedState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Must be called exactly once with a live job descriptor. Rejects a
    /// non-live `request_context` with `ConfigurationError::NotLiveJob`
    /// before touching any state — a backtest job has no business starting
    /// this crate's live producers. Otherwise starts the custom-data
    /// exchange worker and transitions `New -> Active`. A second call fails
    /// with `ConfigurationError::AlreadyInitialized` rather than panicking,
    /// so a misbehaving host gets a recoverable error.
    pub async fn initialize(&self, request_context: &RequestContext) -> Result<(), ConfigurationError> {
        if !request_context.mode.is_live() {
            return Err(ConfigurationError::NotLiveJob(request_context.mode.to_string()));
        }
        if self.state() != FeedState::New {
            return Err(ConfigurationError::AlreadyInitialized);
        }
        self.custom_data_exchange.start().await;
        self.state.store(FeedState::Active as u8, Ordering::Release);
        Ok(())
    }

    /// Sets (or replaces) the "new data available" wake callback for
    /// `configuration`'s subscription, if one is currently registered.
    /// A no-op otherwise — the caller may be racing a concurrent
    /// `remove_subscription`.
    pub fn on_new_data_available(&self, configuration: &SubscriptionConfiguration, callback: crate::subscription::DataAvailableCallback) {
        if let Some(subscription) = self.subscriptions.get(configuration) {
            subscription.on_new_data_available(callback);
        }
    }

    /// Callable only while `Active`. Delegates pipeline assembly to the
    /// factory and, on success, registers the resulting `Subscription`
    /// under its configuration.
    pub async fn create_subscription(&self, request: SubscriptionRequest, algorithm: &dyn Algorithm) -> Result<CreateOutcome, ConfigurationError> {
        if self.state() != FeedState::Active {
            return Err(ConfigurationError::NotActive);
        }

        let configuration = request.configuration.clone();
        match self.factory.create(request, algorithm).await {
            SubscriptionOutcome::Created(subscription) => {
                self.subscriptions.insert(configuration, subscription);
                Ok(CreateOutcome::Created)
            }
            SubscriptionOutcome::Expired(subscription) => {
                self.subscriptions.insert(configuration, subscription);
                Ok(CreateOutcome::Expired)
            }
            SubscriptionOutcome::Failed(reason) => Ok(CreateOutcome::Failed(reason)),
        }
    }

    /// Unsubscribes from whichever source produced this configuration's
    /// live data — the queue handler for streamed configurations (which
    /// also unsubscribes any derived split/dividend configs), or the
    /// custom-data exchange for polled ones — then disposes the
    /// subscription exactly once.
    pub async fn remove_subscription(&self, configuration: &SubscriptionConfiguration) {
        let Some((_, mut subscription)) = self.subscriptions.remove(configuration) else {
            return;
        };

        if self.channel_provider.should_stream(configuration) {
            self.queue_adapter.unsubscribe(configuration).await;
        } else {
            self.custom_data_exchange.remove(&configuration.symbol);
        }

        subscription.dispose();
    }

    pub fn move_next(&self, configuration: &SubscriptionConfiguration) -> bool {
        self.subscriptions.get_mut(configuration).map(|mut sub| sub.move_next()).unwrap_or(false)
    }

    pub fn current(&self, configuration: &SubscriptionConfiguration) -> Option<DataPoint> {
        self.subscriptions.get(configuration).and_then(|sub| sub.current().cloned())
    }

    pub fn is_finished(&self, configuration: &SubscriptionConfiguration) -> bool {
        self.subscriptions.get(configuration).map_or(true, |sub| sub.is_finished())
    }

    pub fn is_subscribed(&self, configuration: &SubscriptionConfiguration) -> bool {
        self.subscriptions.contains_key(configuration)
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Idempotent: `Stopping -> Stopped` only runs once. Stops the
    /// custom-data exchange (signalling every registered polled source) and
    /// disposes every remaining subscription — this crate's own share of
    /// teardown; the historical base feed that backs shared warmup data is
    /// out of scope here.
    pub async fn exit(&self) {
        let previous = self.state.swap(FeedState::Stopping as u8, Ordering::AcqRel);
        if FeedState::from_u8(previous) == FeedState::Stopping || FeedState::from_u8(previous) == FeedState::Stopped {
            self.state.store(FeedState::Stopped as u8, Ordering::Release);
            return;
        }

        self.custom_data_exchange.stop().await;

        let keys: Vec<SubscriptionConfiguration> = self.subscriptions.iter().map(|kv| kv.key().clone()).collect();
        for key in keys {
            if let Some((_, mut subscription)) = self.subscriptions.remove(&key) {
                subscription.dispose();
            }
        }

        self.state.store(FeedState::Stopped as u8, Ordering::Release);
    }
}
