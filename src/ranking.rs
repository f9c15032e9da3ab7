use crate::models::{AssetSnapshotRow, Metric};
use std::cmp::Ordering;

pub const DEFAULT_RANK_LIMIT: usize = 10;

fn by_metric(metric: Metric, a: &AssetSnapshotRow, b: &AssetSnapshotRow) -> Ordering {
    metric
        .value(a)
        .partial_cmp(&metric.value(b))
        .unwrap_or(Ordering::Equal)
}

/// Stable descending sort by `metric`; equal values keep their fetch order.
pub fn sort_table(rows: &[AssetSnapshotRow], metric: Metric) -> Vec<AssetSnapshotRow> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| by_metric(metric, b, a));
    sorted
}

/// First `k` rows by descending `metric`.
pub fn top_gainers(rows: &[AssetSnapshotRow], metric: Metric, k: usize) -> Vec<AssetSnapshotRow> {
    let mut sorted = sort_table(rows, metric);
    sorted.truncate(k);
    sorted
}

/// First `k` rows by ascending `metric`.
pub fn top_losers(rows: &[AssetSnapshotRow], metric: Metric, k: usize) -> Vec<AssetSnapshotRow> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|a, b| by_metric(metric, a, b));
    sorted.truncate(k);
    sorted
}
