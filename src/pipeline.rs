//! One interaction cycle: configuration in, render-ready view out.

use crate::client::CoinGeckoClient;
use crate::coin_list::CoinListFetcher;
use crate::history::HistorySeriesFetcher;
use crate::markets::MarketSnapshotFetcher;
use crate::models::{AssetSnapshotRow, CoinListEntry, Currency};
use crate::normalize::normalize;
use crate::presentation::{LineChartFrame, TreemapFrame, line_chart_frame, treemap_frame};
use crate::ranking::{sort_table, top_gainers, top_losers};
use crate::settings::{DashboardConfig, ViewMode};
use crate::snapshot_log::SnapshotLog;
use crate::storage_utils::{AppConfig, AsyncStorageManager};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{info, warn};

/// Fetchers and the snapshot log shared by every cycle of a session.
pub struct MarketServices {
    pub markets: MarketSnapshotFetcher,
    pub coins: CoinListFetcher,
    pub history: HistorySeriesFetcher,
    pub snapshot_log: Option<SnapshotLog>,
}

impl MarketServices {
    pub fn new(config: &AppConfig, storage: &AsyncStorageManager) -> Result<Self> {
        let snapshot_log = config
            .snapshot_log
            .enabled
            .then(|| SnapshotLog::new(storage.path_for(&config.snapshot_log.file_name)));
        Self::with_snapshot_log(config, snapshot_log)
    }

    pub fn with_snapshot_log(config: &AppConfig, snapshot_log: Option<SnapshotLog>) -> Result<Self> {
        let client = CoinGeckoClient::new(&config.api).context("Failed to create API client")?;
        let cache = &config.cache;

        Ok(Self {
            markets: MarketSnapshotFetcher::new(
                client.clone(),
                Duration::from_secs(cache.market_ttl_secs),
            ),
            coins: CoinListFetcher::new(client.clone(), Duration::from_secs(cache.coin_list_ttl_secs)),
            history: HistorySeriesFetcher::new(
                client,
                config.history_days,
                Duration::from_secs(cache.history_ttl_secs),
            ),
            snapshot_log,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HeatmapView {
    pub config: DashboardConfig,
    /// Normalized table in the selected sort order.
    pub rows: Vec<AssetSnapshotRow>,
    pub gainers: Vec<AssetSnapshotRow>,
    pub losers: Vec<AssetSnapshotRow>,
    pub treemap: TreemapFrame,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct HistoryView {
    pub coin: CoinListEntry,
    pub currency: Currency,
    pub chart: LineChartFrame,
    /// Set when the fetch failed; the chart is then empty and shown as "no data".
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum CycleOutput {
    Heatmap(HeatmapView),
    History(HistoryView),
}

/// Fetch, normalize, log, rank and shape the current market snapshot.
/// Fetch failures propagate to the caller.
pub async fn run_heatmap_cycle(services: &MarketServices, config: &DashboardConfig) -> Result<HeatmapView> {
    config.validate()?;

    let raw = services
        .markets
        .fetch(config.top_n, config.currency)
        .await
        .context("Failed to fetch market snapshot")?;
    let rows = normalize(raw.as_ref().clone());
    let captured_at = Utc::now();

    if let Some(log) = &services.snapshot_log {
        // A broken log file must not take the dashboard down with it.
        if let Err(e) = log.append(&rows, captured_at) {
            warn!("Snapshot log write failed: {:#}", e);
        }
    }

    let sorted = sort_table(&rows, config.sort_by);
    let gainers = top_gainers(&rows, config.rank_by, config.rank_limit);
    let losers = top_losers(&rows, config.rank_by, config.rank_limit);
    let treemap = treemap_frame(&sorted, config.top_n);

    info!(
        "Heatmap cycle: {} rows (top {}, {}, sorted by {})",
        sorted.len(),
        config.top_n,
        config.currency,
        config.sort_by
    );

    Ok(HeatmapView {
        config: config.clone(),
        rows: sorted,
        gainers,
        losers,
        treemap,
        captured_at,
    })
}

/// Never fails: a fetch error degrades to an empty chart with the error attached.
pub async fn run_history_cycle(
    services: &MarketServices,
    coin: &CoinListEntry,
    currency: Currency,
) -> HistoryView {
    let (series, error) = match services.history.fetch(&coin.id, currency).await {
        Ok(series) => (series, None),
        Err(e) => {
            warn!("History fetch for {} failed: {}", coin.id, e);
            (Default::default(), Some(e.to_string()))
        }
    };

    HistoryView {
        coin: coin.clone(),
        currency,
        chart: line_chart_frame(&coin.name, currency, &series),
        error,
    }
}

pub async fn run_cycle(services: &MarketServices, config: &DashboardConfig) -> Result<CycleOutput> {
    match config.mode {
        ViewMode::Heatmap => Ok(CycleOutput::Heatmap(run_heatmap_cycle(services, config).await?)),
        ViewMode::History => {
            let coin = config
                .coin
                .as_ref()
                .ok_or_else(|| anyhow!("No coin selected"))?;
            Ok(CycleOutput::History(
                run_history_cycle(services, coin, config.currency).await,
            ))
        }
    }
}
