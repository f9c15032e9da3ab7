//! comfy-table rendering for the one-shot CLI commands.

use crate::models::{AssetSnapshotRow, CoinListEntry, Metric};
use crate::pipeline::{HeatmapView, HistoryView};
use crate::presentation::{DETAIL_COLUMNS, detail_cells, format_compact, format_pct, format_price};
use crate::snapshot_log::CAPTURE_FORMAT;
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table,
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_BORDERS_ONLY,
};

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label).add_attribute(Attribute::Bold)
}

fn change_color(pct: f64) -> Color {
    if pct > 0.0 {
        Color::Green
    } else if pct < 0.0 {
        Color::Red
    } else {
        Color::White
    }
}

/// Numeric columns are right-aligned and price-change columns coloured by sign.
fn detail_row(row: &AssetSnapshotRow) -> Vec<Cell> {
    let changes = [row.pct_change_1h, row.pct_change_24h, row.pct_change_7d];
    detail_cells(row)
        .into_iter()
        .enumerate()
        .map(|(i, text)| match i {
            0 => Cell::new(text).fg(Color::Cyan),
            1 => Cell::new(text),
            2..=4 => Cell::new(text).set_alignment(CellAlignment::Right),
            _ => Cell::new(text)
                .fg(change_color(changes[i - 5]))
                .set_alignment(CellAlignment::Right),
        })
        .collect()
}

pub fn detail_table(rows: &[AssetSnapshotRow]) -> Table {
    let mut table = base_table();
    table.set_header(DETAIL_COLUMNS.iter().map(|c| header_cell(c)).collect::<Vec<_>>());
    for row in rows {
        table.add_row(detail_row(row));
    }
    table
}

pub fn ranking_table(rows: &[AssetSnapshotRow], metric: Metric) -> Table {
    let mut table = base_table();
    table.set_header(vec![
        header_cell("Rank"),
        header_cell("Asset"),
        header_cell("Price").set_alignment(CellAlignment::Right),
        header_cell(metric.key()).set_alignment(CellAlignment::Right),
    ]);

    for (i, row) in rows.iter().enumerate() {
        let value = metric.value(row);
        let value_text = match metric {
            Metric::MarketCap => format_compact(value),
            _ => format_pct(value),
        };
        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(row.symbol.to_uppercase()).fg(Color::Cyan),
            Cell::new(format_price(row.current_price)).set_alignment(CellAlignment::Right),
            Cell::new(value_text)
                .fg(change_color(value))
                .set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub fn print_heatmap(view: &HeatmapView) {
    let config = &view.config;
    println!(
        "\n{}\n(Data taken at {} UTC, currency {}, sorted by {})",
        view.treemap.title,
        view.captured_at.format(CAPTURE_FORMAT),
        config.currency.as_str().to_uppercase(),
        config.sort_by
    );

    if view.rows.is_empty() {
        println!("No data found.");
        return;
    }

    println!("{}", detail_table(&view.rows));
    println!("\nTop {} gainers by {}", config.rank_limit, config.rank_by);
    println!("{}", ranking_table(&view.gainers, config.rank_by));
    println!("\nTop {} losers by {}", config.rank_limit, config.rank_by);
    println!("{}", ranking_table(&view.losers, config.rank_by));
}

pub fn history_table(view: &HistoryView) -> Option<Table> {
    let points = &view.chart.points;
    let (first, last) = (points.first()?, points.last()?);
    let min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    let mut table = base_table();
    table.set_header(vec![header_cell("Field"), header_cell(&view.chart.y_label)]);
    table.add_row(vec![Cell::new("Points"), Cell::new(points.len())]);
    table.add_row(vec![Cell::new("From"), Cell::new(first.0.format("%Y-%m-%d"))]);
    table.add_row(vec![Cell::new("To"), Cell::new(last.0.format("%Y-%m-%d"))]);
    table.add_row(vec![Cell::new("First"), Cell::new(format_price(first.1))]);
    table.add_row(vec![Cell::new("Last"), Cell::new(format_price(last.1))]);
    table.add_row(vec![Cell::new("Low"), Cell::new(format_price(min))]);
    table.add_row(vec![Cell::new("High"), Cell::new(format_price(max))]);
    if first.1 != 0.0 {
        let change = (last.1 / first.1 - 1.0) * 100.0;
        table.add_row(vec![
            Cell::new("Change"),
            Cell::new(format_pct(change)).fg(change_color(change)),
        ]);
    }
    Some(table)
}

pub fn print_history(view: &HistoryView) {
    println!("\n{}", view.chart.title);
    match history_table(view) {
        Some(table) => println!("{}", table),
        None => {
            println!("No price history available for {}.", view.coin.name);
            if let Some(error) = &view.error {
                println!("({})", error);
            }
        }
    }
}

pub fn coin_table(coins: &[&CoinListEntry]) -> Table {
    let mut table = base_table();
    table.set_header(vec![header_cell("Id"), header_cell("Symbol"), header_cell("Name")]);
    for coin in coins {
        table.add_row(vec![
            Cell::new(&coin.id),
            Cell::new(coin.symbol.to_uppercase()).fg(Color::Cyan),
            Cell::new(&coin.name),
        ]);
    }
    table
}
