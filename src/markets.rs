use crate::client::CoinGeckoClient;
use crate::error::FetchResult;
use crate::models::Currency;
use crate::normalize::RawAssetRecord;
use crate::ttl_cache::TtlCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Ranked asset list from `/coins/markets`, memoized per `(top_n, currency)`.
pub struct MarketSnapshotFetcher {
    client: CoinGeckoClient,
    cache: TtlCache<(u32, Currency), Arc<Vec<RawAssetRecord>>>,
}

fn market_params(top_n: u32, currency: Currency) -> Vec<(&'static str, String)> {
    vec![
        ("vs_currency", currency.as_str().to_string()),
        ("order", "market_cap_desc".to_string()),
        ("per_page", top_n.to_string()),
        ("page", "1".to_string()),
        ("price_change_percentage", "1h,24h,7d".to_string()),
    ]
}

impl MarketSnapshotFetcher {
    pub fn new(client: CoinGeckoClient, ttl: Duration) -> Self {
        Self {
            client,
            cache: TtlCache::new(ttl),
        }
    }

    /// At most `top_n` raw records, ordered by descending market cap upstream.
    pub async fn fetch(&self, top_n: u32, currency: Currency) -> FetchResult<Arc<Vec<RawAssetRecord>>> {
        self.cache
            .get_or_fetch((top_n, currency), || async {
                let mut records: Vec<RawAssetRecord> = self
                    .client
                    .get_json("/coins/markets", &market_params(top_n, currency))
                    .await?;
                records.truncate(top_n as usize);
                info!("Fetched {} market records ({})", records.len(), currency);
                Ok(Arc::new(records))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::storage_utils::ApiConfig;
    use httpmock::prelude::*;
    use serde_json::json;

    fn fetcher(server: &MockServer, timeout_secs: u64) -> MarketSnapshotFetcher {
        let client = CoinGeckoClient::new(&ApiConfig {
            base_url: server.base_url(),
            timeout_secs,
        })
        .unwrap();
        MarketSnapshotFetcher::new(client, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn sends_market_query_and_memoizes() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/coins/markets")
                    .query_param("vs_currency", "eur")
                    .query_param("order", "market_cap_desc")
                    .query_param("per_page", "10")
                    .query_param("page", "1")
                    .query_param("price_change_percentage", "1h,24h,7d");
                then.status(200).json_body(json!([
                    { "id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "market_cap": 1.2e12 },
                    { "id": "ethereum", "symbol": "eth", "name": "Ethereum", "market_cap": 4.0e11 }
                ]));
            })
            .await;

        let fetcher = fetcher(&server, 20);
        let first = fetcher.fetch(10, Currency::Eur).await.unwrap();
        let second = fetcher.fetch(10, Currency::Eur).await.unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(first.len(), 2);
        assert_eq!(second[0].symbol.as_deref(), Some("btc"));
    }

    #[tokio::test]
    async fn non_2xx_surfaces_as_status_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/coins/markets");
                then.status(429).body("rate limited");
            })
            .await;

        let err = fetcher(&server, 20).fetch(30, Currency::Usd).await.unwrap_err();

        match err {
            FetchError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/coins/markets");
                then.status(200)
                    .delay(Duration::from_secs(3))
                    .json_body(json!([]));
            })
            .await;

        let err = fetcher(&server, 1).fetch(10, Currency::Usd).await.unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)), "got {err:?}");
    }
}
