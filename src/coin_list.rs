use crate::client::CoinGeckoClient;
use crate::error::FetchResult;
use crate::models::CoinListEntry;
use crate::ttl_cache::TtlCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Full coin catalogue from `/coins/list`, backing the history coin selector.
pub struct CoinListFetcher {
    client: CoinGeckoClient,
    cache: TtlCache<(), Arc<Vec<CoinListEntry>>>,
}

impl CoinListFetcher {
    pub fn new(client: CoinGeckoClient, ttl: Duration) -> Self {
        Self {
            client,
            cache: TtlCache::new(ttl),
        }
    }

    pub async fn fetch(&self) -> FetchResult<Arc<Vec<CoinListEntry>>> {
        self.cache
            .get_or_fetch((), || async {
                let coins: Vec<CoinListEntry> = self.client.get_json("/coins/list", &[]).await?;
                info!("Fetched coin list with {} entries", coins.len());
                Ok(Arc::new(coins))
            })
            .await
    }
}

/// Resolves a user-supplied coin reference. Exact id wins, then the first exact
/// name match (names are not unique), then the first symbol match.
pub fn find_coin<'a>(coins: &'a [CoinListEntry], query: &str) -> Option<&'a CoinListEntry> {
    let query = query.trim();
    coins
        .iter()
        .find(|c| c.id == query)
        .or_else(|| coins.iter().find(|c| c.name.eq_ignore_ascii_case(query)))
        .or_else(|| coins.iter().find(|c| c.symbol.eq_ignore_ascii_case(query)))
}

/// Case-insensitive substring search over id, symbol and name.
pub fn search_coins<'a>(coins: &'a [CoinListEntry], query: &str) -> Vec<&'a CoinListEntry> {
    let needle = query.trim().to_lowercase();
    coins
        .iter()
        .filter(|c| {
            needle.is_empty()
                || c.id.to_lowercase().contains(&needle)
                || c.symbol.to_lowercase().contains(&needle)
                || c.name.to_lowercase().contains(&needle)
        })
        .collect()
}
