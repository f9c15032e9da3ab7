use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quote currency understood by the markets and market_chart endpoints.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Vnd,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Vnd];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "usd",
            Currency::Eur => "eur",
            Currency::Vnd => "vnd",
        }
    }

    /// Next entry in the selector, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|c| *c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column the table can be sorted or ranked by.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    #[value(alias = "marketcap")]
    MarketCap,
    #[value(alias = "1h", alias = "change-1h")]
    Change1h,
    #[value(alias = "24h", alias = "change-24h")]
    Change24h,
    #[value(alias = "7d", alias = "change-7d")]
    Change7d,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::MarketCap,
        Metric::Change1h,
        Metric::Change24h,
        Metric::Change7d,
    ];

    pub fn value(&self, row: &AssetSnapshotRow) -> f64 {
        match self {
            Metric::MarketCap => row.market_cap,
            Metric::Change1h => row.pct_change_1h,
            Metric::Change24h => row.pct_change_24h,
            Metric::Change7d => row.pct_change_7d,
        }
    }

    /// Label shown in the sort selector.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::MarketCap => "Market Cap",
            Metric::Change1h => "%Change 1h",
            Metric::Change24h => "%Change 24h",
            Metric::Change7d => "%Change 7d",
        }
    }

    /// Short column key used in tables and the snapshot log.
    pub fn key(&self) -> &'static str {
        match self {
            Metric::MarketCap => "market_cap",
            Metric::Change1h => "%1h",
            Metric::Change24h => "%24h",
            Metric::Change7d => "%7d",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Cycles through the percent-change metrics only.
    pub fn next_price_change(self) -> Self {
        match self {
            Metric::Change1h => Metric::Change24h,
            Metric::Change24h => Metric::Change7d,
            Metric::Change7d | Metric::MarketCap => Metric::Change1h,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = String;

    /// Accepts selector labels ("%Change 24h"), column keys ("%24h") and CLI names ("change24h", "change-24h", "24h").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Metric::ALL
            .into_iter()
            .find(|m| {
                m.label().eq_ignore_ascii_case(needle)
                    || m.key().eq_ignore_ascii_case(needle)
                    || m.to_possible_value()
                        .is_some_and(|v| v.matches(needle, true))
            })
            .ok_or_else(|| format!("unknown metric: {}", s))
    }
}

/// One asset after normalization. Serializes with the short display keys.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssetSnapshotRow {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub total_volume: f64,
    #[serde(rename = "%1h")]
    pub pct_change_1h: f64,
    #[serde(rename = "%24h")]
    pub pct_change_24h: f64,
    #[serde(rename = "%7d")]
    pub pct_change_7d: f64,
}

/// Entry of `GET /coins/list`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CoinListEntry {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPoint {
    pub timestamp_ms: i64,
    pub price: f64,
    pub date: DateTime<Utc>,
}

impl HistoryPoint {
    /// Returns `None` when the timestamp is outside chrono's range.
    pub fn new(timestamp_ms: i64, price: f64) -> Option<Self> {
        let date = DateTime::from_timestamp_millis(timestamp_ms)?;
        Some(Self {
            timestamp_ms,
            price,
            date,
        })
    }
}
