//! Stream transformers. Each wraps a `PointSource` upstream with a thin
//! operator, composed by the subscription factory in the mandatory order:
//!
//! ```text
//! raw -> [price-scale] -> [fill-forward] -> [market-hours filter] -> [frontier gate]
//! ```

mod aggregate;
mod auxiliary_sync;
mod concat;
mod fill_forward;
mod filter;
mod frontier_gate;
mod market_hours_filter;
mod merge_ordered;
mod price_scale;

pub use aggregate::AggregateToCollection;
pub use auxiliary_sync::AuxiliarySync;
pub use concat::Concat;
pub use fill_forward::FillForward;
pub use filter::Filter;
pub use frontier_gate::FrontierGate;
pub use market_hours_filter::MarketHoursFilter;
pub use merge_ordered::MergeOrdered;
pub use price_scale::PriceScaleAdjuster;
