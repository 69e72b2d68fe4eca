//! C8: warmup planner. Bounds the history-provider look-back, chains
//! file-based then history-provider then live enumerators, and collapses to
//! the live iterator unchanged when the warmup window holds no tradable day.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::warn;

use crate::data_model::SubscriptionRequest;
use crate::external::{HistoricalFeedFactory, HistoryProvider};
use crate::market_hours::TradingHours;
use crate::point_source::{BoxedSource, VecSource};
use crate::transformers::{Concat, Filter};

/// True if the look-back window `[start_utc, end_utc)` covers at least one
/// tradable day on `hours`.
fn has_tradable_day(hours: &TradingHours, start_utc: DateTime<Utc>, end_utc: DateTime<Utc>) -> bool {
    if end_utc <= start_utc {
        return false;
    }
    let span_days = (end_utc - start_utc).num_days().max(1) + 1;
    (0..span_days).any(|offset| hours.is_tradable_day(start_utc + chrono::Duration::days(offset)))
}

pub struct WarmupPlanner {
    max_look_back: chrono::Duration,
}

impl WarmupPlanner {
    pub fn new(max_look_back: chrono::Duration) -> Self {
        WarmupPlanner { max_look_back }
    }

    /// Splices `live` behind a file-based-then-history-provider warmup
    /// prefix. Returns `live` unchanged if the request's window contains
    /// no tradable day.
    pub async fn build(
        &self,
        request: &SubscriptionRequest,
        now_utc: DateTime<Utc>,
        algo_time_zone: Tz,
        historical_feed_factory: &dyn HistoricalFeedFactory,
        history_provider: &dyn HistoryProvider,
        live: BoxedSource,
    ) -> BoxedSource {
        if !has_tradable_day(&request.security.trading_hours, request.start_utc, now_utc) {
            return live;
        }

        let file_based = match historical_feed_factory.open(request).await {
            Ok(source) => {
                let end_utc = request.end_utc;
                Box::new(Filter::new(source, move |p| !p.is_fill_forward && p.end_time <= end_utc)) as BoxedSource
            }
            Err(err) => {
                warn!(
                    "{:?}: file-based warmup failed, skipping that branch: {}",
                    request.configuration, err
                );
                Box::new(VecSource::empty())
            }
        };

        let history_start = (now_utc - self.max_look_back).max(request.start_utc);
        let history_request = SubscriptionRequest {
            configuration: request.configuration.clone(),
            security: request.security.clone(),
            start_utc: history_start,
            end_utc: now_utc,
            universe: request.universe.clone(),
            is_universe_subscription: request.is_universe_subscription,
        };

        let history_based = match history_provider.get_history(std::slice::from_ref(&history_request), algo_time_zone).await {
            Ok(source) => {
                Box::new(Filter::new(source, move |p| p.end_time <= now_utc)) as BoxedSource
            }
            Err(err) => {
                warn!(
                    "{:?}: history-provider warmup failed, skipping that branch: {}",
                    request.configuration, err
                );
                Box::new(VecSource::empty())
            }
        };

        Box::new(Concat::new(vec![file_based, history_based, live]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_model::*;
    use crate::error::WarmupSourceError;
    use crate::market_hours::DaySession;
    use crate::point_source::VecSource;
    use async_trait::async_trait;
    use chrono::{NaiveTime, TimeZone, Weekday};
    use chrono_tz::America::Chicago;

    fn always_open() -> Arc<TradingHours> {
        let open = DaySession {
            open: Some(NaiveTime::from_hms_opt(0, 0, 0).unwrap()),
            close: Some(NaiveTime::from_hms_opt(23, 59, 59).unwrap()),
            extended_open: None,
            extended_close: None,
        };
        Arc::new(TradingHours {
            timezone: Chicago,
            sunday: open.clone(),
            monday: open.clone(),
            tuesday: open.clone(),
            wednesday: open.clone(),
            thursday: open.clone(),
            friday: open.clone(),
            saturday: open,
            week_start: Weekday::Sun,
        })
    }

    fn closed_forever() -> Arc<TradingHours> {
        Arc::new(TradingHours {
            timezone: Chicago,
            sunday: DaySession::closed(),
            monday: DaySession::closed(),
            tuesday: DaySession::closed(),
            wednesday: DaySession::closed(),
            thursday: DaySession::closed(),
            friday: DaySession::closed(),
            saturday: DaySession::closed(),
            week_start: Weekday::Sun,
        })
    }

    fn request(hours: Arc<TradingHours>, start_utc: DateTime<Utc>, end_utc: DateTime<Utc>) -> SubscriptionRequest {
        SubscriptionRequest {
            configuration: SubscriptionConfiguration {
                symbol: "ES".into(),
                security_type: SecurityType::Future,
                data_type: DataType::Trade,
                resolution: Resolution::Minute(1),
                exchange_time_zone: Chicago,
                data_time_zone: Chicago,
                market_hours_schedule: "CME".into(),
                fill_forward: true,
                extended_hours: false,
                is_internal_feed: false,
                is_filtered: true,
            },
            security: SecurityHandle { trading_hours: hours, delisting_date_utc: None },
            start_utc,
            end_utc,
            universe: None,
            is_universe_subscription: false,
        }
    }

    struct EmptyHistoricalFactory;
    #[async_trait]
    impl HistoricalFeedFactory for EmptyHistoricalFactory {
        async fn open(&self, _request: &SubscriptionRequest) -> Result<BoxedSource, WarmupSourceError> {
            Ok(Box::new(VecSource::empty()))
        }
    }

    struct EmptyHistoryProvider;
    #[async_trait]
    impl HistoryProvider for EmptyHistoryProvider {
        async fn get_history(
            &self,
            _requests: &[SubscriptionRequest],
            _algo_time_zone: Tz,
        ) -> Result<BoxedSource, WarmupSourceError> {
            Ok(Box::new(VecSource::empty()))
        }
    }

    #[tokio::test]
    async fn returns_live_unchanged_when_window_has_no_tradable_day() {
        let now = Utc::now();
        let req = request(closed_forever(), now - chrono::Duration::days(2), now);
        let planner = WarmupPlanner::new(chrono::Duration::days(7));
        let live = VecSource::new(vec![DataPoint::new(
            "ES",
            now,
            now,
            DataValue::Trade { price: Default::default(), volume: Default::default() },
        )]);

        let mut result = planner
            .build(&req, now, Chicago, &EmptyHistoricalFactory, &EmptyHistoryProvider, Box::new(live))
            .await;

        assert!(result.move_next());
        assert!(!result.move_next());
    }

    #[tokio::test]
    async fn splices_warmup_ahead_of_live_when_tradable() {
        let now = Utc::now();
        let req = request(always_open(), now - chrono::Duration::days(2), now);
        let planner = WarmupPlanner::new(chrono::Duration::days(7));
        let live = VecSource::new(vec![DataPoint::new(
            "ES",
            now,
            now,
            DataValue::Trade { price: Default::default(), volume: Default::default() },
        )]);

        let mut result = planner
            .build(&req, now, Chicago, &EmptyHistoricalFactory, &EmptyHistoryProvider, Box::new(live))
            .await;

        // Empty warmup branches, live still reachable.
        assert!(result.move_next());
    }
}
