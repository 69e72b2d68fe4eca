use crate::data_model::SubscriptionConfiguration;
use thiserror::Error;

/// Fatal at `initialize()`: a malformed or non-live job descriptor.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("expected a live job descriptor, got: {0}")]
    NotLiveJob(String),
    #[error("initialize() called more than once")]
    AlreadyInitialized,
    #[error("create_subscription() called before initialize() completed, or after exit()")]
    NotActive,
}

/// A universe subscription was requested against a queue handler that does
/// not implement the universe-provider capability for this security type.
#[derive(Debug, Error)]
#[error("{configuration:?}: queue handler does not support universe subscriptions for this security type")]
pub struct UnsupportedSecurityType {
    pub configuration: SubscriptionConfiguration,
}

/// Raised during pipeline assembly in the subscription factory (C6).
/// Logged and returned to the caller of `create_subscription`; never
/// propagated to or killing the feed.
#[derive(Debug, Error)]
#[error("{configuration:?}: failed to construct subscription: {reason}")]
pub struct SubscriptionConstructionError {
    pub configuration: SubscriptionConfiguration,
    pub reason: String,
}

/// Raised by an upstream producer during a pull or callback. Local to one
/// subscription: the offending bridge queue is stopped, neighbours are
/// unaffected.
#[derive(Debug, Error)]
#[error("{configuration:?}: producer error: {reason}")]
pub struct ProducerError {
    pub configuration: SubscriptionConfiguration,
    pub reason: String,
}

/// Either warmup branch (file-based or history-provider) failed; that
/// branch is skipped and the remaining branches plus the live tail continue.
#[derive(Debug, Error)]
#[error("{configuration:?}: warmup source '{stage}' failed: {reason}")]
pub struct WarmupSourceError {
    pub configuration: SubscriptionConfiguration,
    pub stage: &'static str,
    pub reason: String,
}

/// Top-level error a caller of the feed's lifecycle methods can observe.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    UnsupportedSecurityType(#[from] UnsupportedSecurityType),
    #[error(transparent)]
    SubscriptionConstruction(#[from] SubscriptionConstructionError),
}
