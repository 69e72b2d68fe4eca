//! C6/§6 external collaborators, named by contract only. Everything here is
//! consumed, never implemented, by this crate outside of `feed_core::testing`
//! fakes: the algorithm object, broker/vendor queue handlers, the historical
//! data provider, map/factor file stores, and the channel-provider policy.
//!
//! `async_trait` everywhere, matching the async boundary a real vendor
//! adapter needs on the other side of each of these traits.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::data_model::{SecurityType, SubscriptionConfiguration, SubscriptionRequest, Symbol};
use crate::error::{ProducerError, WarmupSourceError};
use crate::point_source::BoxedSource;

/// Fired by a queue handler (or C4 poll worker) when new data becomes
/// available for a subscription, so the owning `Subscription` can wake its
/// consumer. Holds no reference to the subscription itself — wiring is
/// "weak-style": the notifier closes over a lookup key into the feed's
/// subscription set, never ownership.
pub type NewDataNotifier = Arc<dyn Fn() + Send + Sync>;

/// The external push producer C5 adapts. A broker or vendor connection
/// implements this once; `feed_core` never reaches into its transport.
#[async_trait]
pub trait QueueHandler: Send + Sync {
    /// Subscribes `config` against the producer and returns a pull iterator
    /// whose upstream is the producer's own push-to-pull bridge (typically
    /// built from `feed_core::queue::bounded_queue`). `notifier` fires
    /// whenever the returned source has a new point ready.
    async fn subscribe(
        &self,
        config: &SubscriptionConfiguration,
        notifier: NewDataNotifier,
    ) -> Result<BoxedSource, ProducerError>;

    async fn unsubscribe(&self, config: &SubscriptionConfiguration);

    /// `None` if this producer has no universe-selection capability at all.
    /// Queried per security type since some producers support universes for
    /// equities but not, say, futures chains.
    fn universe_for(&self, _security_type: SecurityType) -> Option<Arc<dyn UniverseProvider>> {
        None
    }
}

/// File-based historical source. Errors
/// surface as end-of-stream plus a logged warning, never a panic.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn open(&self, key: &str) -> std::io::Result<Vec<u8>>;
}

#[derive(Clone, Debug, Default)]
pub struct MapFile {
    pub delisting_date_utc: Option<DateTime<Utc>>,
    pub renames: Vec<(DateTime<Utc>, Symbol)>,
}

#[async_trait]
pub trait MapFileProvider: Send + Sync {
    async fn resolve(&self, config: &SubscriptionConfiguration) -> Option<MapFile>;
}

pub trait FactorFile: Send + Sync {
    fn factor_at(&self, time: DateTime<Utc>) -> Decimal;
}

#[async_trait]
pub trait FactorFileProvider: Send + Sync {
    async fn resolve(&self, config: &SubscriptionConfiguration) -> Option<Arc<dyn FactorFile>>;
}

/// The historical-data provider proper (distinct from file-based warmup,
/// which goes through `HistoricalFeedFactory` below).
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn get_history(
        &self,
        requests: &[SubscriptionRequest],
        algo_time_zone: Tz,
    ) -> Result<BoxedSource, WarmupSourceError>;
}

/// File-based historical reader, named by contract only. The warmup planner (C8) calls this recursively for the same
/// configuration the live branch was built for.
#[async_trait]
pub trait HistoricalFeedFactory: Send + Sync {
    async fn open(&self, request: &SubscriptionRequest) -> Result<BoxedSource, WarmupSourceError>;
}

/// Policy deciding push-streaming vs. poll-ingestion per configuration.
pub trait ChannelProvider: Send + Sync {
    fn should_stream(&self, config: &SubscriptionConfiguration) -> bool;
}

/// Queried by the option-chain / futures-chain universe branches to enumerate contracts for an underlying.
pub trait UniverseProvider: Send + Sync {
    fn option_chain_contracts(&self, underlying: &Symbol, as_of: DateTime<Utc>) -> Vec<Symbol>;
    fn futures_chain_contracts(&self, underlying: &Symbol, as_of: DateTime<Utc>) -> Vec<Symbol>;
}

/// The algorithm object, named by contract only.
pub trait Algorithm: Send + Sync {
    fn is_warming_up(&self) -> bool;
    fn history_provider(&self) -> Arc<dyn HistoryProvider>;
    fn time_zone(&self) -> Tz;
}
