//! Shapes normalized tables into what the chart renderers consume.
//!
//! Nothing here changes a number; it only picks columns and labels.

use crate::models::{AssetSnapshotRow, Currency, HistoryPoint};
use chrono::{DateTime, Utc};

/// Columns of the detail table, in display order.
pub const DETAIL_COLUMNS: [&str; 8] = [
    "symbol",
    "name",
    "current_price",
    "market_cap",
    "total_volume",
    "%1h",
    "%24h",
    "%7d",
];

/// Fields shown when hovering or focusing a treemap tile.
pub const HOVER_FIELDS: [&str; 6] = ["current_price", "market_cap", "total_volume", "%1h", "%24h", "%7d"];

pub type Rgb = (u8, u8, u8);

/// Diverging three-stop colour scale centred on `midpoint`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    pub low: Rgb,
    pub mid: Rgb,
    pub high: Rgb,
    pub midpoint: f64,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            low: (220, 40, 40),
            mid: (255, 255, 255),
            high: (30, 170, 70),
            midpoint: 0.0,
        }
    }
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

impl ColorScale {
    /// Colour for `value` when the scale spans `midpoint ± extent`. Values beyond the
    /// extent saturate at the end colours.
    pub fn color_for(&self, value: f64, extent: f64) -> Rgb {
        if extent <= 0.0 || !value.is_finite() {
            return self.mid;
        }
        let t = ((value - self.midpoint) / extent).clamp(-1.0, 1.0);
        let (target, t) = if t < 0.0 { (self.low, -t) } else { (self.high, t) };
        (
            lerp(self.mid.0, target.0, t),
            lerp(self.mid.1, target.1, t),
            lerp(self.mid.2, target.2, t),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreemapTile {
    /// Hierarchy path; a single level keyed by symbol.
    pub label: String,
    pub area: f64,
    pub color_value: f64,
    pub row: AssetSnapshotRow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreemapFrame {
    pub title: String,
    pub tiles: Vec<TreemapTile>,
    pub color_scale: ColorScale,
    pub hover_fields: &'static [&'static str],
}

impl TreemapFrame {
    /// Largest distance of any colour value from the midpoint, for symmetric scaling.
    pub fn color_extent(&self) -> f64 {
        self.tiles
            .iter()
            .map(|t| (t.color_value - self.color_scale.midpoint).abs())
            .fold(0.0, f64::max)
    }
}

/// Area = market cap, colour = %24h, in the order the table arrives in.
pub fn treemap_frame(rows: &[AssetSnapshotRow], top_n: u32) -> TreemapFrame {
    TreemapFrame {
        title: format!("Crypto Heatmap (Top {}) - MarketCap vs %Change 24h", top_n),
        tiles: rows
            .iter()
            .map(|row| TreemapTile {
                label: row.symbol.to_uppercase(),
                area: row.market_cap,
                color_value: row.pct_change_24h,
                row: row.clone(),
            })
            .collect(),
        color_scale: ColorScale::default(),
        hover_fields: &HOVER_FIELDS,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChartFrame {
    pub title: String,
    pub y_label: String,
    pub points: Vec<(DateTime<Utc>, f64)>,
}

impl LineChartFrame {
    /// Renderers show a "no data" notice instead of an empty chart.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// x = date, y = price.
pub fn line_chart_frame(coin_name: &str, currency: Currency, series: &[HistoryPoint]) -> LineChartFrame {
    LineChartFrame {
        title: format!("{} - 3 year price history", coin_name),
        y_label: format!("Price ({})", currency.as_str().to_uppercase()),
        points: series.iter().map(|p| (p.date, p.price)).collect(),
    }
}

/// Detail-table cells for one row, aligned with `DETAIL_COLUMNS`.
pub fn detail_cells(row: &AssetSnapshotRow) -> [String; 8] {
    [
        row.symbol.to_uppercase(),
        row.name.clone(),
        format_price(row.current_price),
        format_compact(row.market_cap),
        format_compact(row.total_volume),
        format_pct(row.pct_change_1h),
        format_pct(row.pct_change_24h),
        format_pct(row.pct_change_7d),
    ]
}

pub fn format_price(price: f64) -> String {
    if price.abs() >= 1.0 {
        format!("{:.2}", price)
    } else {
        format!("{:.6}", price)
    }
}

pub fn format_pct(pct: f64) -> String {
    format!("{:+.2}%", pct)
}

/// 1.23T / 456.70B / 12.30M / 9.50K
pub fn format_compact(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (value / 1e12, "T")
    } else if abs >= 1e9 {
        (value / 1e9, "B")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "K")
    } else {
        (value, "")
    };
    format!("{:.2}{}", scaled, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, market_cap: f64, pct_24h: f64) -> AssetSnapshotRow {
        AssetSnapshotRow {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            current_price: 0.5,
            market_cap,
            total_volume: 12_300_000.0,
            pct_change_1h: 0.1,
            pct_change_24h: pct_24h,
            pct_change_7d: -2.0,
        }
    }

    #[test]
    fn treemap_maps_area_and_color_without_touching_values() {
        let rows = vec![row("btc", 1.2e12, 2.5), row("eth", 4.0e11, -3.0)];

        let frame = treemap_frame(&rows, 30);

        assert_eq!(frame.title, "Crypto Heatmap (Top 30) - MarketCap vs %Change 24h");
        assert_eq!(frame.tiles.len(), 2);
        assert_eq!(frame.tiles[0].label, "BTC");
        assert_eq!(frame.tiles[0].area, 1.2e12);
        assert_eq!(frame.tiles[1].color_value, -3.0);
        assert_eq!(frame.color_extent(), 3.0);
        assert_eq!(frame.hover_fields.len(), 6);
    }

    #[test]
    fn color_scale_is_anchored_at_zero() {
        let scale = ColorScale::default();

        assert_eq!(scale.color_for(0.0, 5.0), scale.mid);
        assert_eq!(scale.color_for(5.0, 5.0), scale.high);
        assert_eq!(scale.color_for(-9.0, 5.0), scale.low);
        assert_eq!(scale.color_for(1.0, 0.0), scale.mid);

        let (r, g, _) = scale.color_for(-2.5, 5.0);
        assert!(r > g, "negative values lean red");
    }

    #[test]
    fn line_chart_uses_dates_and_prices() {
        let series = vec![
            HistoryPoint::new(1_700_000_000_000, 1.0).unwrap(),
            HistoryPoint::new(1_700_086_400_000, 2.0).unwrap(),
        ];

        let frame = line_chart_frame("Bitcoin", Currency::Eur, &series);

        assert_eq!(frame.y_label, "Price (EUR)");
        assert_eq!(frame.points[1].1, 2.0);
        assert_eq!(frame.points[0].0, series[0].date);
        assert!(line_chart_frame("Nothing", Currency::Usd, &[]).is_empty());
    }

    #[test]
    fn detail_cells_follow_column_order() {
        let cells = detail_cells(&row("sol", 9_500.0, 1.234));

        assert_eq!(cells.len(), DETAIL_COLUMNS.len());
        assert_eq!(cells[0], "SOL");
        assert_eq!(cells[2], "0.500000");
        assert_eq!(cells[3], "9.50K");
        assert_eq!(cells[4], "12.30M");
        assert_eq!(cells[6], "+1.23%");
        assert_eq!(cells[7], "-2.00%");
    }
}
