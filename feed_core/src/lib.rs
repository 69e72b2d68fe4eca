//! `feed_core`: the live market-data feed core of an algorithmic trading
//! engine. Bridges push-style producers (broker/vendor connections, polled
//! custom-data sources) into ordered, frontier-gated, warmup-spliced pull
//! iterators one `Subscription` per requested configuration.
//!
//! Component map:
//!
//! - C1 [`time`]               — time providers (`RealClock`, `ManualClock`, `PredicateGatedClock`)
//! - C2 [`queue`]               — bounded push-to-pull bridge
//! - C3 [`transformers`]        — price-scale / fill-forward / market-hours / frontier-gate chain
//! - C4 [`custom_data_exchange`] — cooperative poll worker for slow/custom sources
//! - C5 [`queue_handler_adapter`] — auxiliary-stream-aware wrapper over an external `QueueHandler`
//! - C6 [`factory`]             — per-request subscription assembly
//! - C7 [`feed`]                — feed lifecycle (initialize / create / remove / exit)
//! - C8 [`warmup`]              — warmup splicing ahead of the live tail
//!
//! [`external`] names the collaborators this crate consumes but never
//! implements outside of [`testing`] fakes.

pub mod config;
pub mod custom_data_exchange;
pub mod data_model;
pub mod error;
pub mod external;
pub mod factory;
pub mod feed;
pub mod market_hours;
pub mod point_source;
pub mod queue;
pub mod queue_handler_adapter;
pub mod subscription;
pub mod time;
pub mod transformers;
pub mod universe;
pub mod warmup;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::FeedConfig;
pub use data_model::{
    AuxiliaryEvent, DataPoint, DataType, DataValue, JobMode, RequestContext, Resolution, SecurityHandle, SecurityType,
    SubscriptionConfiguration, SubscriptionRequest, Symbol, UniverseHandle, UniverseKind,
};
pub use error::{ConfigurationError, FeedError, ProducerError, SubscriptionConstructionError, UnsupportedSecurityType, WarmupSourceError};
pub use factory::{SubscriptionFactory, SubscriptionOutcome};
pub use feed::FeedCore;
pub use point_source::{BoxedSource, PointSource};
pub use subscription::Subscription;
pub use time::TimeProvider;
