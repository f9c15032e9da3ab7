use crate::client::CoinGeckoClient;
use crate::error::FetchResult;
use crate::models::{Currency, HistoryPoint};
use crate::ttl_cache::TtlCache;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Deserialize, Debug, Default)]
struct MarketChartResponse {
    #[serde(default)]
    prices: Option<Value>,
}

/// Daily-ish price series from `/coins/{id}/market_chart`, memoized per `(id, currency)`.
pub struct HistorySeriesFetcher {
    client: CoinGeckoClient,
    days: u32,
    cache: TtlCache<(String, Currency), Arc<Vec<HistoryPoint>>>,
}

fn parse_point(pair: &Value) -> Option<HistoryPoint> {
    let pair = pair.as_array()?;
    let timestamp_ms = pair
        .first()
        .and_then(|ts| ts.as_i64().or_else(|| ts.as_f64().map(|f| f as i64)))?;
    let price = pair.get(1).and_then(Value::as_f64).filter(|p| p.is_finite())?;
    HistoryPoint::new(timestamp_ms, price)
}

/// Absent, null or non-array `prices` all yield an empty series.
fn parse_series(response: MarketChartResponse) -> Vec<HistoryPoint> {
    let Some(Value::Array(raw)) = response.prices else {
        return Vec::new();
    };

    let mut points: Vec<HistoryPoint> = raw.iter().filter_map(parse_point).collect();
    if points.len() < raw.len() {
        warn!("skipped {} malformed price points", raw.len() - points.len());
    }
    points.sort_by_key(|p| p.timestamp_ms);
    points
}

impl HistorySeriesFetcher {
    pub fn new(client: CoinGeckoClient, days: u32, ttl: Duration) -> Self {
        Self {
            client,
            days,
            cache: TtlCache::new(ttl),
        }
    }

    /// An empty vector means "no history", which is not an error.
    pub async fn fetch(&self, coin_id: &str, currency: Currency) -> FetchResult<Arc<Vec<HistoryPoint>>> {
        self.cache
            .get_or_fetch((coin_id.to_string(), currency), || async {
                let path = format!("/coins/{}/market_chart", coin_id);
                let params = [
                    ("vs_currency", currency.as_str().to_string()),
                    ("days", self.days.to_string()),
                ];
                let response: MarketChartResponse = self.client.get_json(&path, &params).await?;
                let points = parse_series(response);
                info!("Fetched {} history points for {} ({})", points.len(), coin_id, currency);
                Ok(Arc::new(points))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_utils::ApiConfig;
    use httpmock::prelude::*;
    use serde_json::json;

    fn response(value: Value) -> MarketChartResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn empty_or_absent_prices_yield_empty_series() {
        assert!(parse_series(response(json!({ "prices": [] }))).is_empty());
        assert!(parse_series(response(json!({}))).is_empty());
        assert!(parse_series(response(json!({ "prices": null }))).is_empty());
        assert!(parse_series(response(json!({ "error": "coin not found" }))).is_empty());
    }

    #[test]
    fn series_is_ordered_and_skips_malformed_points() {
        let series = parse_series(response(json!({
            "prices": [
                [1_700_086_400_000i64, 2.0],
                [1_700_000_000_000i64, 1.0],
                ["bad", 3.0],
                [1_700_172_800_000i64],
                [1_700_172_800_000.0, 3.5]
            ]
        })));

        let stamps: Vec<i64> = series.iter().map(|p| p.timestamp_ms).collect();
        assert_eq!(stamps, vec![1_700_000_000_000, 1_700_086_400_000, 1_700_172_800_000]);
        assert_eq!(series[2].price, 3.5);
        assert_eq!(series[1].date.format("%Y-%m-%d").to_string(), "2023-11-15");
    }

    #[tokio::test]
    async fn requests_three_years_and_memoizes_per_coin() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/coins/bitcoin/market_chart")
                    .query_param("vs_currency", "usd")
                    .query_param("days", "1095");
                then.status(200)
                    .json_body(json!({ "prices": [[1_700_000_000_000i64, 37_000.0]] }));
            })
            .await;
        let client = CoinGeckoClient::new(&ApiConfig {
            base_url: server.base_url(),
            timeout_secs: 20,
        })
        .unwrap();
        let fetcher = HistorySeriesFetcher::new(client, 1095, Duration::from_secs(3600));

        let first = fetcher.fetch("bitcoin", Currency::Usd).await.unwrap();
        let again = fetcher.fetch("bitcoin", Currency::Usd).await.unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(first.len(), 1);
        assert_eq!(again[0].price, 37_000.0);
    }
}
