//! End-to-end coverage of the six scenarios a live feed must get right:
//! expired-symbol warmup, fill-forward gaps, corporate-action ordering,
//! frontier lag, after-hours universe gating, and exit under active polled
//! iterators. Each builds a real `FeedCore` over `feed_core::testing` fakes
//! rather than mocking the pipeline pieces individually.

use std::sync::Arc;

use chrono::{Duration, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::America::Chicago;
use dashmap::DashMap;
use rust_decimal_macros::dec;

use feed_core::custom_data_exchange::CustomDataExchange;
use feed_core::data_model::*;
use feed_core::factory::SubscriptionFactory;
use feed_core::feed::{CreateOutcome, FeedCore};
use feed_core::market_hours::{DaySession, TradingHours};
use feed_core::queue_handler_adapter::QueueHandlerAdapter;
use feed_core::testing::{
    FakeAlgorithm, FakeChannelProvider, FakeCustomDataSourceFactory, FakeFactorFileProvider, FakeHistoricalFeedFactory,
    FakeHistoryProvider, FakeMapFileProvider, FakeQueueHandler, SteppedFactorFile,
};
use feed_core::time::ManualClock;
use feed_core::warmup::WarmupPlanner;
use feed_core::external::MapFile;

fn always_open_hours() -> Arc<TradingHours> {
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

struct Harness {
    queue_handler: Arc<FakeQueueHandler>,
    history_provider: Arc<FakeHistoryProvider>,
    custom_data_factory: Arc<FakeCustomDataSourceFactory>,
    map_file_provider: Arc<FakeMapFileProvider>,
    factor_file_provider: Arc<FakeFactorFileProvider>,
    frontier: Arc<ManualClock>,
    feed: FeedCore<FakeQueueHandler>,
    algorithm: FakeAlgorithm,
}

fn build_harness(now: chrono::DateTime<Utc>, streamed: bool) -> Harness {
    let queue_handler = Arc::new(FakeQueueHandler::new());
    let queue_adapter = Arc::new(QueueHandlerAdapter::new(queue_handler.clone()));
    let channel_provider: Arc<dyn feed_core::external::ChannelProvider> = if streamed {
        Arc::new(FakeChannelProvider::streaming())
    } else {
        Arc::new(FakeChannelProvider::polling())
    };
    let history_provider = Arc::new(FakeHistoryProvider::new());
    let historical_feed_factory = Arc::new(FakeHistoricalFeedFactory::new());
    let custom_data_factory = Arc::new(FakeCustomDataSourceFactory::new());
    let map_file_provider = Arc::new(FakeMapFileProvider::new());
    let factor_file_provider = Arc::new(FakeFactorFileProvider::new());
    let custom_data_exchange = Arc::new(CustomDataExchange::new(std::time::Duration::from_millis(10)));
    let frontier = Arc::new(ManualClock::new(now));
    let subscriptions = Arc::new(DashMap::new());

    let factory = SubscriptionFactory::new(
        queue_adapter.clone(),
        channel_provider.clone(),
        map_file_provider.clone(),
        factor_file_provider.clone(),
        historical_feed_factory.clone(),
        custom_data_factory.clone(),
        custom_data_exchange.clone(),
        frontier.clone(),
        WarmupPlanner::new(Duration::days(7)),
        subscriptions.clone(),
    );

    let feed = FeedCore::new(factory, queue_adapter, channel_provider, custom_data_exchange, subscriptions);
    let algorithm = FakeAlgorithm::new(frontier.clone(), history_provider.clone(), Chicago);

    Harness {
        queue_handler,
        history_provider,
        custom_data_factory,
        map_file_provider,
        factor_file_provider,
        frontier,
        feed,
        algorithm,
    }
}

fn equity_config(symbol: &str, fill_forward: bool, is_filtered: bool) -> SubscriptionConfiguration {
    SubscriptionConfiguration {
        symbol: symbol.into(),
        security_type: SecurityType::Equity,
        data_type: DataType::Trade,
        resolution: Resolution::Minute(1),
        exchange_time_zone: Chicago,
        data_time_zone: Chicago,
        market_hours_schedule: "NYSE".into(),
        fill_forward,
        extended_hours: false,
        is_internal_feed: false,
        is_filtered,
    }
}

fn bar(symbol: &str, start: chrono::DateTime<Utc>, end: chrono::DateTime<Utc>, close: rust_decimal::Decimal) -> DataPoint {
    DataPoint::new(symbol, start, end, DataValue::Bar { open: close, high: close, low: close, close, volume: dec!(1) })
}

fn request_for(configuration: SubscriptionConfiguration, hours: Arc<TradingHours>, start_utc: chrono::DateTime<Utc>, end_utc: chrono::DateTime<Utc>) -> SubscriptionRequest {
    SubscriptionRequest {
        configuration,
        security: SecurityHandle { trading_hours: hours, delisting_date_utc: None },
        start_utc,
        end_utc,
        universe: None,
        is_universe_subscription: false,
    }
}

/// Scenario 1: symbol delisted 2013-01-01, requested 2020-06-01 with
/// warmup on. Live iterator must be empty; the history-provider warmup
/// branch yields exactly the bars seeded within the 7-day look-back.
#[tokio::test]
async fn expired_equity_warmup_yields_only_history_bars() {
    let now = Chicago.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap().to_utc();
    let harness = build_harness(now, true);
    harness.algorithm.set_warming_up(true);

    let config = equity_config("ENRN", false, false);
    harness.map_file_provider.seed(
        config.clone(),
        MapFile { delisting_date_utc: Some(Chicago.with_ymd_and_hms(2013, 1, 1, 0, 0, 0).unwrap().to_utc()), renames: vec![] },
    );

    let history_start = now - Duration::days(2);
    let bars = vec![
        bar("ENRN", history_start, history_start + Duration::minutes(1), dec!(10)),
        bar("ENRN", history_start + Duration::minutes(1), history_start + Duration::minutes(2), dec!(11)),
    ];
    harness.history_provider.seed(config.clone(), bars.clone());

    harness.feed.initialize(&RequestContext::live()).await.unwrap();
    let request = request_for(config.clone(), always_open_hours(), now - Duration::days(7), now);
    let outcome = harness.feed.create_subscription(request, &harness.algorithm).await.unwrap();
    assert!(matches!(outcome, CreateOutcome::Expired));

    let mut received = Vec::new();
    while harness.feed.move_next(&config) {
        received.push(harness.feed.current(&config).unwrap());
    }
    assert_eq!(received.len(), bars.len());
    for (point, expected) in received.iter().zip(bars.iter()) {
        assert_eq!(point.start_time, expected.start_time);
    }
}

/// Scenario 2: real bars at 09:30 and 09:35 with a 1-minute resolution;
/// four synthetic bars fill the gap, each repeating the 09:30 close.
#[tokio::test]
async fn fill_forward_synthesizes_bars_across_a_five_minute_gap() {
    let now = Chicago.with_ymd_and_hms(2024, 1, 9, 9, 0, 0).unwrap().to_utc();
    let harness = build_harness(now, true);
    harness.frontier.set(now + Duration::hours(2));

    let config = SubscriptionConfiguration {
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
    };

    harness.feed.initialize(&RequestContext::live()).await.unwrap();
    let end_utc = now + Duration::hours(1);
    let request = request_for(config.clone(), always_open_hours(), now, end_utc);
    let outcome = harness.feed.create_subscription(request, &harness.algorithm).await.unwrap();
    assert!(matches!(outcome, CreateOutcome::Created));

    let open = Chicago.with_ymd_and_hms(2024, 1, 9, 9, 30, 0).unwrap().to_utc();
    harness.queue_handler.push(&config, bar("ES", open, open + Duration::minutes(1), dec!(100)));
    let next_real = open + Duration::minutes(5);
    harness.queue_handler.push(&config, bar("ES", next_real, next_real + Duration::minutes(1), dec!(105)));

    let mut received = Vec::new();
    for _ in 0..6 {
        assert!(harness.feed.move_next(&config));
        received.push(harness.feed.current(&config).unwrap());
    }
    assert!(!harness.feed.move_next(&config));

    assert_eq!(received.len(), 6);
    assert!(!received[0].is_fill_forward);
    for synthetic in &received[1..5] {
        assert!(synthetic.is_fill_forward);
        match &synthetic.value {
            DataValue::Bar { close, .. } => assert_eq!(*close, dec!(100)),
            _ => panic!("expected bar"),
        }
    }
    assert!(!received[5].is_fill_forward);
}

/// Scenario 3: a 4:1 split lands at the same instant as a trade bar; the
/// split emits first, and only later bars carry the post-split scale.
#[tokio::test]
async fn equity_split_orders_before_same_instant_bar_and_scales_afterwards() {
    let now = Chicago.with_ymd_and_hms(2020, 8, 31, 9, 0, 0).unwrap().to_utc();
    let harness = build_harness(now, true);
    harness.frontier.set(now + Duration::hours(2));

    let config = equity_config("AAPL", false, false);
    let split_time = Chicago.with_ymd_and_hms(2020, 8, 31, 9, 30, 0).unwrap().to_utc();
    let next_bar_time = split_time + Duration::minutes(1);

    harness.factor_file_provider.seed(
        config.clone(),
        Arc::new(SteppedFactorFile { effective_at: next_bar_time, before: dec!(1), after: dec!(0.25) }),
    );

    harness.feed.initialize(&RequestContext::live()).await.unwrap();
    let request = request_for(config.clone(), always_open_hours(), now, now + Duration::hours(3));
    let outcome = harness.feed.create_subscription(request, &harness.algorithm).await.unwrap();
    assert!(matches!(outcome, CreateOutcome::Created));

    let aux_config = config.auxiliary_configs().into_iter().find(|c| c.data_type == DataType::Split).unwrap();
    harness.queue_handler.push(&aux_config, DataPoint::new("AAPL", split_time, split_time, DataValue::Auxiliary(AuxiliaryEvent::Split { factor_numerator: 1, factor_denominator: 4 })));
    harness.queue_handler.push(&config, bar("AAPL", split_time, split_time, dec!(400)));
    harness.queue_handler.push(&config, bar("AAPL", next_bar_time, next_bar_time + Duration::minutes(1), dec!(400)));

    assert!(harness.feed.move_next(&config));
    let first = harness.feed.current(&config).unwrap();
    assert!(matches!(first.value, DataValue::Auxiliary(AuxiliaryEvent::Split { .. })));

    assert!(harness.feed.move_next(&config));
    let split_day_bar = harness.feed.current(&config).unwrap();
    match split_day_bar.value {
        DataValue::Bar { close, .. } => assert_eq!(close, dec!(400)),
        _ => panic!("expected bar"),
    }

    assert!(harness.feed.move_next(&config));
    let scaled_bar = harness.feed.current(&config).unwrap();
    match scaled_bar.value {
        DataValue::Bar { close, .. } => assert_eq!(close, dec!(100)),
        _ => panic!("expected bar"),
    }
}

/// Scenario 4: frontier frozen at `T`; a bar queued for `T + 1s` is
/// withheld until the frontier catches up, then delivered exactly once.
#[tokio::test]
async fn frontier_gate_withholds_future_point_until_clock_advances() {
    let t = Chicago.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap().to_utc();
    let harness = build_harness(t, true);

    let config = SubscriptionConfiguration {
        symbol: "ES".into(),
        security_type: SecurityType::Future,
        data_type: DataType::Trade,
        resolution: Resolution::Tick,
        exchange_time_zone: Chicago,
        data_time_zone: Chicago,
        market_hours_schedule: "CME".into(),
        fill_forward: false,
        extended_hours: false,
        is_internal_feed: false,
        is_filtered: false,
    };

    harness.feed.initialize(&RequestContext::live()).await.unwrap();
    let request = request_for(config.clone(), always_open_hours(), t, t + Duration::hours(1));
    harness.feed.create_subscription(request, &harness.algorithm).await.unwrap();

    let future_point = bar("ES", t + Duration::seconds(1), t + Duration::seconds(1), dec!(1));
    harness.queue_handler.push(&config, future_point.clone());

    assert!(!harness.feed.move_next(&config));
    harness.frontier.set(t + Duration::seconds(1));
    assert!(harness.feed.move_next(&config));
    assert_eq!(harness.feed.current(&config).unwrap().end_time, future_point.end_time);
    assert!(!harness.feed.move_next(&config));
}

/// Scenario 5: a coarse-universe snapshot ready at 01:00 local must wait
/// for the next eligible hour (5 <= hour < 23, not Saturday).
#[tokio::test]
async fn coarse_universe_selection_waits_for_eligible_hours() {
    let saturday_1am = Utc.with_ymd_and_hms(2024, 1, 6, 1, 0, 0).unwrap();
    let harness = build_harness(saturday_1am, false);

    let config = SubscriptionConfiguration {
        symbol: "coarse-universe".into(),
        security_type: SecurityType::Equity,
        data_type: DataType::Custom("coarse".into()),
        resolution: Resolution::Day,
        exchange_time_zone: Chicago,
        data_time_zone: Chicago,
        market_hours_schedule: "NYSE".into(),
        fill_forward: false,
        extended_hours: false,
        is_internal_feed: true,
        is_filtered: false,
    };

    harness.custom_data_factory.seed(
        config.clone(),
        vec![DataPoint::new("AAPL", saturday_1am, saturday_1am, DataValue::Trade { price: dec!(1), volume: dec!(1) })],
    );

    harness.feed.initialize(&RequestContext::live()).await.unwrap();
    let mut request = request_for(config.clone(), always_open_hours(), saturday_1am, saturday_1am + Duration::days(3));
    request.is_universe_subscription = true;
    request.universe = Some((UniverseHandle(1), UniverseKind::Coarse));
    harness.feed.create_subscription(request, &harness.algorithm).await.unwrap();

    assert!(!harness.feed.move_next(&config), "Saturday 1am is not an eligible selection hour");

    let sunday_six_am = Utc.with_ymd_and_hms(2024, 1, 7, 6, 0, 0).unwrap();
    harness.frontier.set(sunday_six_am);
    // Give the custom-data exchange's background worker a chance to poll the
    // snapshot and push it through the C2 bridge.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(harness.feed.move_next(&config), "06:00 Sunday is inside the eligible window");
}

/// Scenario 6: two polled subscriptions are still active when `exit()` is
/// called; both stop immediately and neither yields anything after.
#[tokio::test]
async fn exit_stops_custom_data_exchange_and_active_subscriptions_go_silent() {
    let now = Utc::now();
    let harness = build_harness(now, false);

    let config_a = SubscriptionConfiguration {
        symbol: "custom-a".into(),
        security_type: SecurityType::Crypto,
        data_type: DataType::Custom("metrics".into()),
        resolution: Resolution::Minute(1),
        exchange_time_zone: Chicago,
        data_time_zone: Chicago,
        market_hours_schedule: "24/7".into(),
        fill_forward: false,
        extended_hours: true,
        is_internal_feed: false,
        is_filtered: false,
    };
    let mut config_b = config_a.clone();
    config_b.symbol = "custom-b".into();

    for config in [&config_a, &config_b] {
        harness.custom_data_factory.seed(
            config.clone(),
            vec![DataPoint::new(config.symbol.clone(), now, now, DataValue::Trade { price: dec!(1), volume: dec!(1) })],
        );
    }

    harness.feed.initialize(&RequestContext::live()).await.unwrap();
    for config in [&config_a, &config_b] {
        let request = request_for(config.clone(), always_open_hours(), now, now + Duration::days(1));
        let outcome = harness.feed.create_subscription(request, &harness.algorithm).await.unwrap();
        assert!(matches!(outcome, CreateOutcome::Created));
    }

    harness.feed.exit().await;

    for config in [&config_a, &config_b] {
        assert!(!harness.feed.is_subscribed(config));
        assert!(!harness.feed.move_next(config));
        assert!(harness.feed.is_finished(config));
    }
}
