use crypto_heatmap::models::{CoinListEntry, Currency, Metric};
use crypto_heatmap::pipeline::{CycleOutput, MarketServices, run_cycle, run_heatmap_cycle, run_history_cycle};
use crypto_heatmap::settings::{DashboardConfig, ViewMode};
use crypto_heatmap::snapshot_log::SnapshotLog;
use crypto_heatmap::storage_utils::{ApiConfig, AppConfig};
use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn app_config(server: &MockServer) -> AppConfig {
    AppConfig {
        api: ApiConfig {
            base_url: server.base_url(),
            timeout_secs: 5,
        },
        ..AppConfig::default()
    }
}

fn bitcoin() -> CoinListEntry {
    CoinListEntry {
        id: "bitcoin".to_string(),
        symbol: "btc".to_string(),
        name: "Bitcoin".to_string(),
    }
}

fn markets_body() -> serde_json::Value {
    json!([
        { "id": "aaa", "symbol": "aaa", "name": "Alpha", "current_price": 10.0, "market_cap": 300.0,
          "total_volume": 5.0, "price_change_percentage_1h_in_currency": 0.5,
          "price_change_percentage_24h_in_currency": 3.0, "price_change_percentage_7d_in_currency": 1.0 },
        { "id": "xxx", "symbol": "xxx", "name": "Dead", "current_price": 1.0, "market_cap": 0,
          "price_change_percentage_24h_in_currency": null },
        { "id": "bbb", "symbol": "bbb", "name": "Beta", "current_price": "2.5", "market_cap": 200.0,
          "total_volume": 1.0, "price_change_percentage_24h_in_currency": -1.0 },
        { "id": "ccc", "symbol": "ccc", "name": "Gamma", "current_price": 0.1, "market_cap": 100.0,
          "total_volume": null, "price_change_percentage_1h_in_currency": "oops",
          "price_change_percentage_24h_in_currency": 7.0 }
    ])
}

#[tokio::test]
async fn heatmap_cycle_normalizes_sorts_ranks_and_logs() {
    let server = MockServer::start_async().await;
    let markets = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/coins/markets")
                .query_param("vs_currency", "usd")
                .query_param("per_page", "30");
            then.status(200).json_body(markets_body());
        })
        .await;

    let dir = TempDir::new().unwrap();
    let log = SnapshotLog::new(dir.path().join("crypto_snapshot.csv"));
    let services = MarketServices::with_snapshot_log(&app_config(&server), Some(log.clone())).unwrap();
    let config = DashboardConfig::default()
        .with_sort_by(Metric::Change24h)
        .with_rank_by(Metric::Change24h);

    let view = run_heatmap_cycle(&services, &config).await.unwrap();

    let symbols: Vec<&str> = view.rows.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["ccc", "aaa", "bbb"]);
    assert_eq!(view.rows[2].current_price, 2.5);
    assert_eq!(view.rows[0].pct_change_1h, 0.0);
    assert_eq!(view.gainers[0].symbol, "ccc");
    assert_eq!(view.losers[0].symbol, "bbb");
    assert_eq!(view.treemap.tiles.len(), 3);
    assert_eq!(view.treemap.tiles[0].area, 100.0);

    // Second cycle inside the TTL reuses the fetch but still logs a snapshot.
    run_heatmap_cycle(&services, &config).await.unwrap();
    markets.assert_hits_async(1).await;

    let content = std::fs::read_to_string(log.path()).unwrap();
    assert_eq!(content.lines().count(), 1 + 3 + 3);
    assert!(!content.contains("xxx"));
}

#[tokio::test]
async fn heatmap_fetch_failure_propagates() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/coins/markets");
            then.status(500).body("upstream down");
        })
        .await;
    let services = MarketServices::with_snapshot_log(&app_config(&server), None).unwrap();

    let err = run_heatmap_cycle(&services, &DashboardConfig::default())
        .await
        .unwrap_err();

    assert!(format!("{:#}", err).contains("500"));
}

#[tokio::test]
async fn empty_history_is_no_data_not_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/coins/bitcoin/market_chart")
                .query_param("days", "1095");
            then.status(200).json_body(json!({ "prices": [] }));
        })
        .await;
    let services = MarketServices::with_snapshot_log(&app_config(&server), None).unwrap();

    let view = run_history_cycle(&services, &bitcoin(), Currency::Usd).await;

    assert!(view.chart.is_empty());
    assert!(view.error.is_none());
}

#[tokio::test]
async fn history_fetch_failure_degrades_to_no_data() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/coins/bitcoin/market_chart");
            then.status(404).json_body(json!({ "error": "coin not found" }));
        })
        .await;
    let services = MarketServices::with_snapshot_log(&app_config(&server), None).unwrap();
    let config = DashboardConfig::default()
        .with_mode(ViewMode::History)
        .with_coin(bitcoin());

    let output = run_cycle(&services, &config).await.unwrap();

    match output {
        CycleOutput::History(view) => {
            assert!(view.chart.is_empty());
            assert!(view.error.unwrap().contains("404"));
        }
        CycleOutput::Heatmap(_) => panic!("expected a history view"),
    }
}

#[tokio::test]
async fn history_mode_without_coin_is_rejected() {
    let server = MockServer::start_async().await;
    let services = MarketServices::with_snapshot_log(&app_config(&server), None).unwrap();
    let config = DashboardConfig::default().with_mode(ViewMode::History);

    assert!(run_cycle(&services, &config).await.is_err());
}
