use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;

use crate::market_hours::TradingHours;

pub type Symbol = String;

/// The kind of instrument a subscription refers to. Widened only as far as
/// the corporate-action and universe-selection branches need.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SecurityType {
    Equity,
    Forex,
    Crypto,
    Future,
    Option,
    Cfd,
    Index,
}

/// The shape of data a subscription wants. `Dividend`/`Split` are never
/// requested directly by a strategy; they are attached by the queue-handler
/// adapter (C5) for equity configurations, one per corporate-action stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Trade,
    Quote,
    Bar,
    Dividend,
    Split,
    Custom(String),
}

/// `Day` sits alongside tick/second/minute/hour because the fill-forward
/// bar-boundary computation and the warmup day-count bound both need it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resolution {
    Tick,
    Second(u32),
    Minute(u32),
    Hour(u32),
    Day,
}

impl Resolution {
    /// Fixed-width resolutions have a well defined bar length; `Tick` does
    /// not (a tick is not a time bucket) and fill-forward never applies to
    /// it.
    pub fn as_duration(&self) -> Option<chrono::Duration> {
        match self {
            Resolution::Tick => None,
            Resolution::Second(n) => Some(chrono::Duration::seconds(*n as i64)),
            Resolution::Minute(n) => Some(chrono::Duration::minutes(*n as i64)),
            Resolution::Hour(n) => Some(chrono::Duration::hours(*n as i64)),
            Resolution::Day => Some(chrono::Duration::days(1)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuxiliaryEvent {
    Split { factor_numerator: i64, factor_denominator: i64 },
    Dividend { amount_micros: i64 },
    Delisting,
    SymbolChange { new_symbol: Symbol },
}

#[derive(Clone, Debug, PartialEq)]
pub enum DataValue {
    Trade { price: Decimal, volume: Decimal },
    Quote { bid: Decimal, ask: Decimal, bid_size: Decimal, ask_size: Decimal },
    Bar { open: Decimal, high: Decimal, low: Decimal, close: Decimal, volume: Decimal },
    Auxiliary(AuxiliaryEvent),
    Collection(Vec<DataPoint>),
}

impl DataValue {
    pub fn is_auxiliary(&self) -> bool {
        matches!(self, DataValue::Auxiliary(_))
    }

    /// Multiplies every price field by `factor`. No-op on non-price
    /// payloads.
    pub fn scale_price(&mut self, factor: Decimal) {
        match self {
            DataValue::Trade { price, .. } => *price *= factor,
            DataValue::Quote { bid, ask, .. } => {
                *bid *= factor;
                *ask *= factor;
            }
            DataValue::Bar { open, high, low, close, .. } => {
                *open *= factor;
                *high *= factor;
                *low *= factor;
                *close *= factor;
            }
            DataValue::Auxiliary(_) | DataValue::Collection(_) => {}
        }
    }

    /// The most recent real close/price, used by fill-forward to seed a
    /// synthetic point. `None` for payloads with nothing to repeat.
    pub fn last_price(&self) -> Option<Decimal> {
        match self {
            DataValue::Trade { price, .. } => Some(*price),
            DataValue::Quote { bid, ask, .. } => Some((*bid + *ask) / Decimal::TWO),
            DataValue::Bar { close, .. } => Some(*close),
            DataValue::Auxiliary(_) | DataValue::Collection(_) => None,
        }
    }

    /// A flat synthetic bar/quote/trade repeating `price`, used by
    /// fill-forward.
    pub fn flat_at(&self, price: Decimal) -> DataValue {
        match self {
            DataValue::Trade { .. } => DataValue::Trade { price, volume: Decimal::ZERO },
            DataValue::Quote { .. } => DataValue::Quote { bid: price, ask: price, bid_size: Decimal::ZERO, ask_size: Decimal::ZERO },
            DataValue::Bar { .. } => DataValue::Bar { open: price, high: price, low: price, close: price, volume: Decimal::ZERO },
            other => other.clone(),
        }
    }
}

/// A single timestamped record flowing through a subscription's pipeline.
///
/// Invariant: `end_time >= start_time`. `end_time` is the instant the point
/// becomes knowable and is what the frontier gate and warmup filters key
/// off of.
#[derive(Clone, Debug, PartialEq)]
pub struct DataPoint {
    pub symbol: Symbol,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub value: DataValue,
    pub is_fill_forward: bool,
}

impl DataPoint {
    pub fn new(symbol: impl Into<Symbol>, start_time: DateTime<Utc>, end_time: DateTime<Utc>, value: DataValue) -> Self {
        debug_assert!(end_time >= start_time, "end_time must not precede start_time");
        DataPoint { symbol: symbol.into(), start_time, end_time, value, is_fill_forward: false }
    }

    pub fn fill_forward_of(&self, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        let price = self.value.last_price().unwrap_or_default();
        DataPoint {
            symbol: self.symbol.clone(),
            start_time,
            end_time,
            value: self.value.flat_at(price),
            is_fill_forward: true,
        }
    }
}

/// Immutable, structurally-equal record identifying what a subscription
/// consumes. Two `SubscriptionConfiguration`s are the same subscription iff
/// they are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionConfiguration {
    pub symbol: Symbol,
    pub security_type: SecurityType,
    pub data_type: DataType,
    pub resolution: Resolution,
    pub exchange_time_zone: Tz,
    pub data_time_zone: Tz,
    /// Reference id for the security's market-hours schedule. Kept as an id
    /// (not the schedule itself) so configuration equality stays structural
    /// and cheap; the actual `TradingHours` travels on the request's
    /// `SecurityHandle`.
    pub market_hours_schedule: String,
    pub fill_forward: bool,
    pub extended_hours: bool,
    pub is_internal_feed: bool,
    pub is_filtered: bool,
}

impl SubscriptionConfiguration {
    pub fn is_filtered_subscription(&self) -> bool {
        self.is_filtered
    }

    /// §4.6 step 3: price scaling only applies in live mode.
    pub fn prices_should_be_scaled(&self, live_mode: bool) -> bool {
        live_mode && matches!(self.security_type, SecurityType::Equity)
    }

    /// Derives the dividend and split configurations for equities that are
    /// not internal feeds (§4.5). Kept as two distinct configurations,
    /// rather than one collapsed auxiliary stream, since the adapter and
    /// `AuxiliarySync` merge any number of derived streams uniformly.
    pub fn auxiliary_configs(&self) -> Vec<SubscriptionConfiguration> {
        if self.security_type != SecurityType::Equity || self.is_internal_feed {
            return vec![];
        }
        vec![
            SubscriptionConfiguration { data_type: DataType::Dividend, ..self.clone() },
            SubscriptionConfiguration { data_type: DataType::Split, ..self.clone() },
        ]
    }
}

/// Cache + exchange-hours bundle attached to a subscription request. Opaque
/// beyond the trading-hours schedule the pipeline needs to filter on.
#[derive(Clone)]
pub struct SecurityHandle {
    pub trading_hours: Arc<TradingHours>,
    pub delisting_date_utc: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniverseHandle(pub u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UniverseKind {
    TimeTriggered { selection_interval: chrono::Duration },
    Coarse,
    EtfConstituent { etf_symbol: Symbol },
    OptionChain,
    FuturesChain,
    Custom(String),
}

pub struct SubscriptionRequest {
    pub configuration: SubscriptionConfiguration,
    pub security: SecurityHandle,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub universe: Option<(UniverseHandle, UniverseKind)>,
    pub is_universe_subscription: bool,
}

/// Mirrors the host's strategy-mode enum. Only `Live` and
/// `LivePaperTrading` describe a job this crate may drive — a `Backtest`
/// job replays history elsewhere and has no business starting this crate's
/// live producers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobMode {
    Backtest,
    Live,
    LivePaperTrading,
}

impl JobMode {
    pub fn is_live(&self) -> bool {
        matches!(self, JobMode::Live | JobMode::LivePaperTrading)
    }
}

impl std::fmt::Display for JobMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobMode::Backtest => write!(f, "Backtest"),
            JobMode::Live => write!(f, "Live"),
            JobMode::LivePaperTrading => write!(f, "LivePaperTrading"),
        }
    }
}

/// The job descriptor `FeedCore::initialize` is handed by the host. Only
/// `mode` matters to this crate; everything else about a job (brokerage,
/// account, deployment id) lives upstream.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub mode: JobMode,
}

impl RequestContext {
    pub fn live() -> Self {
        RequestContext { mode: JobMode::Live }
    }

    pub fn live_paper_trading() -> Self {
        RequestContext { mode: JobMode::LivePaperTrading }
    }

    pub fn backtest() -> Self {
        RequestContext { mode: JobMode::Backtest }
    }
}
