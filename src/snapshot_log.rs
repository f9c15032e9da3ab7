use crate::models::AssetSnapshotRow;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CAPTURE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Serialize)]
struct LogRecord<'a> {
    symbol: &'a str,
    name: &'a str,
    current_price: f64,
    market_cap: f64,
    total_volume: f64,
    #[serde(rename = "%1h")]
    pct_change_1h: f64,
    #[serde(rename = "%24h")]
    pct_change_24h: f64,
    #[serde(rename = "%7d")]
    pct_change_7d: f64,
    timestamp: &'a str,
}

/// Append-only CSV log of every snapshot taken. Never rotated or truncated.
#[derive(Debug, Clone)]
pub struct SnapshotLog {
    path: PathBuf,
}

impl SnapshotLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `rows` stamped with `captured_at`. The header goes in only when the file
    /// is empty. All rows are encoded up front and handed to a single append write,
    /// so concurrent writers may interleave snapshots but never split a row.
    pub fn append(&self, rows: &[AssetSnapshotRow], captured_at: DateTime<Utc>) -> Result<usize> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open snapshot log {:?}", self.path))?;
        let write_header = file.metadata()?.len() == 0;

        let timestamp = captured_at.format(CAPTURE_FORMAT).to_string();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(Vec::new());
        for row in rows {
            writer.serialize(LogRecord {
                symbol: &row.symbol,
                name: &row.name,
                current_price: row.current_price,
                market_cap: row.market_cap,
                total_volume: row.total_volume,
                pct_change_1h: row.pct_change_1h,
                pct_change_24h: row.pct_change_24h,
                pct_change_7d: row.pct_change_7d,
                timestamp: &timestamp,
            })?;
        }
        let buffer = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to encode snapshot: {}", e))?;

        file.write_all(&buffer)
            .with_context(|| format!("Failed to append to {:?}", self.path))?;

        info!("Appended {} rows to {:?}", rows.len(), self.path);
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn row(symbol: &str) -> AssetSnapshotRow {
        AssetSnapshotRow {
            symbol: symbol.to_string(),
            name: format!("{} coin", symbol),
            current_price: 1.5,
            market_cap: 100.0,
            total_volume: 10.0,
            pct_change_1h: 0.5,
            pct_change_24h: -1.25,
            pct_change_7d: 3.0,
        }
    }

    #[test]
    fn header_written_once_then_rows_appended() {
        let dir = tempdir().unwrap();
        let log = SnapshotLog::new(dir.path().join("crypto_snapshot.csv"));
        let t1 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 1, 0).unwrap();

        log.append(&[row("btc"), row("eth")], t1).unwrap();
        log.append(&[row("sol")], t2).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "symbol,name,current_price,market_cap,total_volume,%1h,%24h,%7d,timestamp"
        );
        assert_eq!(lines[1], "btc,btc coin,1.5,100.0,10.0,0.5,-1.25,3.0,2024-05-01 12:00:00");
        assert!(lines[3].starts_with("sol,"));
        assert!(lines[3].ends_with("2024-05-01 12:01:00"));
        assert_eq!(content.matches("symbol,name").count(), 1);
    }

    #[test]
    fn empty_snapshot_defers_header_to_first_rows() {
        let dir = tempdir().unwrap();
        let log = SnapshotLog::new(dir.path().join("log.csv"));

        let written = log.append(&[], Utc::now()).unwrap();
        assert_eq!(written, 0);
        assert!(log.path().exists());

        log.append(&[row("ada")], Utc::now()).unwrap();
        let content = std::fs::read_to_string(log.path()).unwrap();
        assert!(content.starts_with("symbol,name,"));
        assert_eq!(content.lines().count(), 2);
    }
}
