//! Per-interaction dashboard configuration.
//!
//! A `DashboardConfig` is never mutated in place: every widget change produces a new
//! value via the `with_*` methods, and the pipeline only ever sees one immutable value
//! per cycle.

use crate::models::{CoinListEntry, Currency, Metric};
use crate::storage_utils::DefaultsConfig;
use anyhow::{Result, bail};

pub const TOP_N_MIN: u32 = 10;
pub const TOP_N_MAX: u32 = 100;
pub const TOP_N_STEP: u32 = 10;
pub const REFRESH_MAX_SECS: u64 = 600;
pub const REFRESH_STEP_SECS: u64 = 30;
/// Gainers/losers can never list more rows than the snapshot holds.
pub const RANK_LIMIT_MAX: usize = TOP_N_MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Heatmap,
    History,
}

impl ViewMode {
    pub fn toggle(self) -> Self {
        match self {
            ViewMode::Heatmap => ViewMode::History,
            ViewMode::History => ViewMode::Heatmap,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::Heatmap => "Current heatmap",
            ViewMode::History => "3-year history",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub mode: ViewMode,
    pub top_n: u32,
    pub currency: Currency,
    pub sort_by: Metric,
    pub rank_by: Metric,
    pub rank_limit: usize,
    /// 0 disables auto-refresh.
    pub refresh_secs: u64,
    pub coin: Option<CoinListEntry>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::from_defaults(&DefaultsConfig::default())
    }
}

impl DashboardConfig {
    pub fn from_defaults(defaults: &DefaultsConfig) -> Self {
        Self {
            mode: ViewMode::Heatmap,
            top_n: defaults.top_n.clamp(TOP_N_MIN, TOP_N_MAX),
            currency: defaults.currency,
            sort_by: defaults.sort_by,
            rank_by: defaults.rank_by,
            rank_limit: defaults.rank_limit.clamp(1, RANK_LIMIT_MAX),
            refresh_secs: defaults.refresh_secs.min(REFRESH_MAX_SECS),
            coin: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(TOP_N_MIN..=TOP_N_MAX).contains(&self.top_n) {
            bail!("top_n must be between {} and {}, got {}", TOP_N_MIN, TOP_N_MAX, self.top_n);
        }
        if self.refresh_secs > REFRESH_MAX_SECS {
            bail!("refresh interval must be at most {}s, got {}", REFRESH_MAX_SECS, self.refresh_secs);
        }
        if !(1..=RANK_LIMIT_MAX).contains(&self.rank_limit) {
            bail!("rank limit must be between 1 and {}, got {}", RANK_LIMIT_MAX, self.rank_limit);
        }
        Ok(())
    }

    pub fn with_mode(&self, mode: ViewMode) -> Self {
        Self { mode, ..self.clone() }
    }

    /// Moves top_n by `steps` slider notches, clamped to the slider range.
    pub fn with_top_n_step(&self, steps: i32) -> Self {
        let top_n = (self.top_n as i64 + steps as i64 * TOP_N_STEP as i64)
            .clamp(TOP_N_MIN as i64, TOP_N_MAX as i64) as u32;
        Self { top_n, ..self.clone() }
    }

    pub fn with_currency(&self, currency: Currency) -> Self {
        Self { currency, ..self.clone() }
    }

    pub fn with_sort_by(&self, sort_by: Metric) -> Self {
        Self { sort_by, ..self.clone() }
    }

    pub fn with_rank_by(&self, rank_by: Metric) -> Self {
        Self { rank_by, ..self.clone() }
    }

    pub fn with_refresh_step(&self, steps: i64) -> Self {
        let refresh_secs = (self.refresh_secs as i64 + steps * REFRESH_STEP_SECS as i64)
            .clamp(0, REFRESH_MAX_SECS as i64) as u64;
        Self { refresh_secs, ..self.clone() }
    }

    pub fn with_coin(&self, coin: CoinListEntry) -> Self {
        Self {
            coin: Some(coin),
            ..self.clone()
        }
    }

    pub fn auto_refresh(&self) -> Option<std::time::Duration> {
        (self.refresh_secs > 0).then(|| std::time::Duration::from_secs(self.refresh_secs))
    }
}
