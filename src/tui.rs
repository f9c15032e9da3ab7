use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Clear, Dataset, GraphType, Paragraph, Row, Table, Wrap},
};
use std::cmp::Ordering;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::coin_list::{find_coin, search_coins};
use crate::models::{AssetSnapshotRow, CoinListEntry, Metric};
use crate::pipeline::{CycleOutput, HeatmapView, HistoryView, MarketServices, run_cycle};
use crate::presentation::{
    DETAIL_COLUMNS, TreemapFrame, detail_cells, format_compact, format_pct, format_price,
};
use crate::settings::{DashboardConfig, RANK_LIMIT_MAX, ViewMode};

const DEFAULT_COIN_ID: &str = "bitcoin";
const COIN_PAGE: usize = 10;

// --- Messages & App State ---

enum Message {
    Cycle { generation: u64, result: Result<CycleOutput> },
    Coins(Result<Arc<Vec<CoinListEntry>>>),
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Quit,
    Recompute,
    Redraw,
}

struct App {
    config: DashboardConfig,
    coins: Arc<Vec<CoinListEntry>>,
    coins_loading: bool,
    coins_failed: bool,
    /// Cursor into `visible_coins()`, not into the full list.
    coin_cursor: usize,
    coin_filter: String,
    filter_editing: bool,
    heatmap: Option<HeatmapView>,
    history: Option<HistoryView>,
    status: Option<String>,
    is_refreshing: bool,
    generation: u64,
    last_cycle_at: Option<Instant>,
    show_table: bool,
}

impl App {
    fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            coins: Arc::new(Vec::new()),
            coins_loading: false,
            coins_failed: false,
            coin_cursor: 0,
            coin_filter: String::new(),
            filter_editing: false,
            heatmap: None,
            history: None,
            status: None,
            is_refreshing: false,
            generation: 0,
            last_cycle_at: None,
            show_table: false,
        }
    }

    /// Swaps in a new configuration; only an actual change asks for a recomputation.
    fn apply_config(&mut self, next: DashboardConfig) -> KeyOutcome {
        if next == self.config {
            return KeyOutcome::Redraw;
        }
        self.config = next;
        KeyOutcome::Recompute
    }

    /// Stores the coin list and picks a default coin. Returns true when the history
    /// view was waiting on it.
    fn set_coins(&mut self, result: Result<Arc<Vec<CoinListEntry>>>) -> bool {
        self.coins_loading = false;
        let coins = match result {
            Ok(coins) => coins,
            Err(e) => {
                warn!("Coin list fetch failed: {:#}", e);
                self.coins_failed = true;
                self.status = Some(format!("Coin list unavailable: {:#}", e));
                return false;
            }
        };
        if self.coins_failed {
            self.coins_failed = false;
            self.status = None;
        }
        self.coins = coins;

        let was_waiting = self.config.coin.is_none();
        let selected = match &self.config.coin {
            Some(coin) => Some(coin.clone()),
            None => find_coin(&self.coins, DEFAULT_COIN_ID)
                .or_else(|| self.coins.first())
                .cloned(),
        };
        if let Some(coin) = selected {
            let cursor = self.visible_coins().iter().position(|c| c.id == coin.id);
            self.coin_cursor = cursor.unwrap_or(0);
            self.config = self.config.with_coin(coin);
        }

        was_waiting && self.config.coin.is_some() && self.config.mode == ViewMode::History
    }

    fn begin_cycle(&mut self, now: Instant) -> (u64, DashboardConfig) {
        self.generation += 1;
        self.is_refreshing = true;
        self.last_cycle_at = Some(now);
        (self.generation, self.config.clone())
    }

    /// Results of superseded cycles are dropped. Errors keep the last good view on screen.
    fn apply_cycle(&mut self, generation: u64, result: Result<CycleOutput>) {
        if generation != self.generation {
            debug!("discarding result of superseded cycle {}", generation);
            return;
        }
        self.is_refreshing = false;

        match result {
            Ok(CycleOutput::Heatmap(view)) => {
                self.heatmap = Some(view);
                self.status = None;
            }
            Ok(CycleOutput::History(view)) => {
                self.status = view.error.as_ref().map(|e| format!("History fetch failed: {}", e));
                self.history = Some(view);
            }
            Err(e) => {
                warn!("Cycle failed: {:#}", e);
                self.status = Some(format!("{:#}", e));
            }
        }
    }

    /// Auto-refresh tick: due once the interval has elapsed since the last cycle started.
    fn refresh_due(&self, now: Instant) -> bool {
        match (self.config.auto_refresh(), self.last_cycle_at) {
            (Some(interval), Some(last)) => !self.is_refreshing && now.duration_since(last) >= interval,
            _ => false,
        }
    }

    /// Coins matching the typed filter; the whole list while the filter is empty.
    fn visible_coins(&self) -> Vec<&CoinListEntry> {
        search_coins(&self.coins, &self.coin_filter)
    }

    fn set_filter(&mut self, filter: String) {
        self.coin_filter = filter;
        self.coin_cursor = 0;
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.visible_coins().len();
        if len == 0 {
            return;
        }
        let max = len as isize - 1;
        self.coin_cursor = (self.coin_cursor as isize + delta).clamp(0, max) as usize;
    }
}

/// Keys typed while the coin filter is being edited. Returns `None` for keys that
/// keep their usual meaning (arrows, Enter, Tab).
fn handle_filter_key(key: KeyEvent, app: &mut App) -> Option<KeyOutcome> {
    match key.code {
        KeyCode::Esc => {
            app.filter_editing = false;
            app.set_filter(String::new());
        }
        KeyCode::Backspace => {
            let mut filter = app.coin_filter.clone();
            filter.pop();
            app.set_filter(filter);
        }
        KeyCode::Char(ch) => {
            let mut filter = app.coin_filter.clone();
            filter.push(ch);
            app.set_filter(filter);
        }
        KeyCode::Enter => {
            app.filter_editing = false;
            return None;
        }
        _ => return None,
    }
    Some(KeyOutcome::Redraw)
}

fn handle_key_event(key: KeyEvent, app: &mut App) -> KeyOutcome {
    let config = app.config.clone();
    let heatmap = config.mode == ViewMode::Heatmap;

    if app.filter_editing && !heatmap {
        if let Some(outcome) = handle_filter_key(key, app) {
            return outcome;
        }
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => KeyOutcome::Quit,
        KeyCode::Char('m') | KeyCode::Tab => app.apply_config(config.with_mode(config.mode.toggle())),
        KeyCode::Char('c') => app.apply_config(config.with_currency(config.currency.next())),
        KeyCode::Char('+') | KeyCode::Char('=') if heatmap => app.apply_config(config.with_top_n_step(1)),
        KeyCode::Char('-') if heatmap => app.apply_config(config.with_top_n_step(-1)),
        KeyCode::Char('s') if heatmap => app.apply_config(config.with_sort_by(config.sort_by.next())),
        KeyCode::Char('r') if heatmap => {
            app.apply_config(config.with_rank_by(config.rank_by.next_price_change()))
        }
        KeyCode::Char(']') => app.apply_config(config.with_refresh_step(1)),
        KeyCode::Char('[') => app.apply_config(config.with_refresh_step(-1)),
        KeyCode::Char('t') if heatmap => {
            app.show_table = !app.show_table;
            KeyOutcome::Redraw
        }
        KeyCode::F(5) if !app.is_refreshing => KeyOutcome::Recompute,
        KeyCode::Char('/') if !heatmap => {
            app.filter_editing = true;
            KeyOutcome::Redraw
        }
        KeyCode::Up if !heatmap => {
            app.move_cursor(-1);
            KeyOutcome::Redraw
        }
        KeyCode::Down if !heatmap => {
            app.move_cursor(1);
            KeyOutcome::Redraw
        }
        KeyCode::PageUp if !heatmap => {
            app.move_cursor(-(COIN_PAGE as isize));
            KeyOutcome::Redraw
        }
        KeyCode::PageDown if !heatmap => {
            app.move_cursor(COIN_PAGE as isize);
            KeyOutcome::Redraw
        }
        KeyCode::Enter if !heatmap => {
            let selected = app.visible_coins().get(app.coin_cursor).cloned().cloned();
            match selected {
                Some(coin) => app.apply_config(config.with_coin(coin)),
                None => KeyOutcome::Redraw,
            }
        }
        _ => KeyOutcome::Redraw,
    }
}

// --- Background work ---

/// At most one coin list request is in flight at a time.
fn spawn_coin_list(app: &mut App, services: &Arc<MarketServices>, tx: &mpsc::Sender<Message>) {
    if app.coins_loading {
        return;
    }
    app.coins_loading = true;

    let services = Arc::clone(services);
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = services.coins.fetch().await.map_err(anyhow::Error::from);
        let _ = tx.send(Message::Coins(result)).await;
    });
}

/// Starts a full recomputation for the current config. In-flight cycles are not
/// aborted; their results are ignored once they arrive.
///
/// History needs a coin, so without a coin list this refetches the list instead.
fn spawn_cycle(app: &mut App, services: &Arc<MarketServices>, tx: &mpsc::Sender<Message>) {
    if app.config.mode == ViewMode::History && app.config.coin.is_none() {
        if app.coins.is_empty() {
            spawn_coin_list(app, services, tx);
        }
        if !app.coins_failed {
            app.status = Some("Waiting for coin list...".to_string());
        }
        return;
    }

    let (generation, config) = app.begin_cycle(Instant::now());
    let services = Arc::clone(services);
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = run_cycle(&services, &config).await;
        let _ = tx.send(Message::Cycle { generation, result }).await;
    });
}

// --- TUI ---

pub async fn run_tui(services: Arc<MarketServices>, config: DashboardConfig) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, services, config).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    services: Arc<MarketServices>,
    config: DashboardConfig,
) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<Message>(16);
    let mut app = App::new(config);

    spawn_coin_list(&mut app, &services, &tx);
    spawn_cycle(&mut app, &services, &tx);

    loop {
        terminal.draw(|f| ui(f, &app))?;

        while let Ok(message) = rx.try_recv() {
            match message {
                Message::Cycle { generation, result } => app.apply_cycle(generation, result),
                Message::Coins(result) => {
                    if app.set_coins(result) {
                        spawn_cycle(&mut app, &services, &tx);
                    }
                }
            }
        }

        if app.refresh_due(Instant::now()) {
            spawn_cycle(&mut app, &services, &tx);
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key_event(key, &mut app) {
                    KeyOutcome::Quit => return Ok(()),
                    KeyOutcome::Recompute => spawn_cycle(&mut app, &services, &tx),
                    KeyOutcome::Redraw => {}
                }
            }
            // Resize needs nothing: the next draw picks up the new size.
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let main_layout = Layout::horizontal([Constraint::Length(32), Constraint::Min(0)]).split(f.size());
    let content =
        Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).split(main_layout[1]);

    render_sidebar(f, app, main_layout[0]);
    render_status(f, app, content[0]);

    match app.config.mode {
        ViewMode::Heatmap => match &app.heatmap {
            Some(view) => render_heatmap(f, app, view, content[1]),
            None => render_notice(f, "Loading market data...", content[1]),
        },
        ViewMode::History => match &app.history {
            Some(view) => render_history(f, view, content[1]),
            None => render_notice(f, "Select a coin and press Enter", content[1]),
        },
    }

    if app.is_refreshing {
        let area = centered_rect(40, 20, main_layout[1]);
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new("Fetching data...\nPlease wait.")
                .block(Block::default().title("Refreshing").borders(Borders::ALL))
                .alignment(Alignment::Center),
            area,
        );
    }
}

fn setting_line(label: &str, value: String, dimmed: bool) -> Line<'static> {
    let value_style = if dimmed {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Yellow)
    };
    Line::from(vec![
        Span::styled(format!("{:<10}", label), Style::default().fg(Color::Gray)),
        Span::styled(value, value_style),
    ])
}

fn render_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Settings");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let config = &app.config;
    let history = config.mode == ViewMode::History;
    let refresh = match config.refresh_secs {
        0 => "off".to_string(),
        s => format!("{}s", s),
    };

    let mut lines = vec![
        setting_line("Mode", config.mode.label().to_string(), false),
        setting_line("Currency", config.currency.as_str().to_uppercase(), false),
        setting_line("Top N", config.top_n.to_string(), history),
        setting_line("Sort", config.sort_by.label().to_string(), history),
        setting_line("Rank by", config.rank_by.label().to_string(), history),
        setting_line("Refresh", refresh, false),
        Line::from(""),
    ];
    let help: &[&str] = if history {
        &["m mode  c currency", "↑↓ PgUp PgDn select", "/ search  Enter load", "[ ] refresh  q quit"]
    } else {
        &["m mode  c currency", "+/- top N  s sort", "r rank  t table", "[ ] refresh  F5 reload", "q quit"]
    };
    lines.extend(help.iter().map(|h| Line::styled(*h, Style::default().fg(Color::DarkGray))));

    let help_height = lines.len() as u16;
    let chunks = Layout::vertical([Constraint::Length(help_height), Constraint::Min(0)]).split(inner);
    f.render_widget(Paragraph::new(lines), chunks[0]);

    if history {
        render_coin_selector(f, app, chunks[1]);
    }
}

fn render_coin_selector(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::TOP).title("Coin");
    let inner = block.inner(area);
    f.render_widget(block, area);

    if app.coins.is_empty() {
        let message = if app.coins_loading {
            "Loading coin list..."
        } else if app.coins_failed {
            "Coin list unavailable\nF5 to retry"
        } else {
            "No coins listed"
        };
        f.render_widget(Paragraph::new(message), inner);
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    if app.filter_editing || !app.coin_filter.is_empty() {
        let cursor = if app.filter_editing { "_" } else { "" };
        lines.push(Line::styled(
            format!("/{}{}", app.coin_filter, cursor),
            Style::default().fg(Color::Cyan),
        ));
    }

    let visible = app.visible_coins();
    if visible.is_empty() {
        lines.push(Line::styled("No matching coins", Style::default().fg(Color::DarkGray)));
        f.render_widget(Paragraph::new(lines), inner);
        return;
    }

    let height = (inner.height as usize).saturating_sub(lines.len());
    let start = app
        .coin_cursor
        .saturating_sub(height / 2)
        .min(visible.len().saturating_sub(height));
    let selected_id = app.config.coin.as_ref().map(|c| c.id.as_str());

    lines.extend(visible.iter().enumerate().skip(start).take(height).map(|(i, coin)| {
        let marker = if Some(coin.id.as_str()) == selected_id { "* " } else { "  " };
        let mut line = Line::from(format!("{}{}", marker, coin.name));
        if i == app.coin_cursor {
            line = line.style(Style::default().fg(Color::Yellow).bg(Color::DarkGray));
        }
        line
    }));
    f.render_widget(Paragraph::new(lines), inner);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let title = match (&app.config.mode, &app.heatmap, &app.history) {
        (ViewMode::Heatmap, Some(view), _) => format!(
            "{} | Data taken at {} UTC",
            view.treemap.title,
            view.captured_at.format("%Y-%m-%d %H:%M:%S")
        ),
        (ViewMode::History, _, Some(view)) => view.chart.title.clone(),
        _ => "Crypto Heatmap".to_string(),
    };

    let status = match &app.status {
        Some(message) => Line::styled(message.clone(), Style::default().fg(Color::Red)),
        None => Line::styled("OK", Style::default().fg(Color::DarkGray)),
    };

    f.render_widget(
        Paragraph::new(status).block(
            Block::default()
                .borders(Borders::ALL)
                .title_alignment(Alignment::Center)
                .title(title),
        ),
        area,
    );
}

fn render_notice(f: &mut Frame, message: &str, area: Rect) {
    f.render_widget(
        Paragraph::new(message)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL)),
        area,
    );
}

/// Rows plus header and borders.
fn ranking_height(rank_limit: usize) -> u16 {
    (rank_limit.min(RANK_LIMIT_MAX) as u16).saturating_add(3)
}

fn render_heatmap(f: &mut Frame, app: &App, view: &HeatmapView, area: Rect) {
    let ranking_height = ranking_height(view.config.rank_limit);
    let chunks = Layout::vertical([
        Constraint::Min(6),
        Constraint::Length(1),
        Constraint::Length(ranking_height),
    ])
    .split(area);

    if view.rows.is_empty() {
        render_notice(f, "No data", chunks[0]);
    } else if app.show_table {
        render_detail_table(f, &view.rows, chunks[0]);
    } else {
        render_treemap(f, &view.treemap, chunks[0]);
    }

    render_legend(f, chunks[1]);

    let ranking = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);
    let rank_by = view.config.rank_by;
    render_ranking(f, &format!("Top gainers ({})", rank_by.key()), &view.gainers, rank_by, ranking[0]);
    render_ranking(f, &format!("Top losers ({})", rank_by.key()), &view.losers, rank_by, ranking[1]);
}

fn render_treemap(f: &mut Frame, frame: &TreemapFrame, area: Rect) {
    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let weights: Vec<f64> = frame.tiles.iter().map(|t| t.area).collect();
    let rects = layout_treemap(&weights, inner);
    let extent = frame.color_extent();

    for (tile, rect) in frame.tiles.iter().zip(rects) {
        if rect.width == 0 || rect.height == 0 {
            continue;
        }
        let (r, g, b) = frame.color_scale.color_for(tile.color_value, extent);
        let style = Style::default().bg(Color::Rgb(r, g, b)).fg(Color::Black);

        let mut lines = vec![Line::styled(tile.label.clone(), Style::default().add_modifier(Modifier::BOLD))];
        if rect.height >= 2 {
            lines.push(Line::from(format_pct(tile.color_value)));
        }
        if rect.height >= 3 {
            lines.push(Line::from(format_price(tile.row.current_price)));
        }
        if rect.height >= 4 {
            lines.push(Line::from(format!("cap {}", format_compact(tile.row.market_cap))));
        }
        if rect.height >= 5 {
            lines.push(Line::from(format!(
                "1h {} 7d {}",
                format_pct(tile.row.pct_change_1h),
                format_pct(tile.row.pct_change_7d)
            )));
        }

        f.render_widget(
            Paragraph::new(lines).style(style).alignment(Alignment::Center),
            rect,
        );
    }
}

fn render_legend(f: &mut Frame, area: Rect) {
    let swatch = |color: Color, text: &'static str| {
        vec![
            Span::styled("  ", Style::default().bg(color)),
            Span::raw(text),
        ]
    };
    let mut spans = swatch(Color::Rgb(30, 170, 70), " rising 24h   ");
    spans.extend(swatch(Color::Rgb(255, 255, 255), " flat   "));
    spans.extend(swatch(Color::Rgb(220, 40, 40), " falling 24h   "));
    spans.push(Span::styled(
        "area = market cap",
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn change_style(value: f64) -> Style {
    match value.partial_cmp(&0.0) {
        Some(Ordering::Greater) => Style::default().fg(Color::Green),
        Some(Ordering::Less) => Style::default().fg(Color::Red),
        _ => Style::default(),
    }
}

fn render_ranking(f: &mut Frame, title: &str, rows: &[AssetSnapshotRow], metric: Metric, area: Rect) {
    let header = Row::new(["#", "Asset", "Price", metric.key()]).style(Style::default().bg(Color::DarkGray));
    let body = rows.iter().enumerate().map(|(i, row)| {
        let value = metric.value(row);
        let value_text = match metric {
            Metric::MarketCap => format_compact(value),
            _ => format_pct(value),
        };
        Row::new([
            Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
            Cell::from(row.symbol.to_uppercase()).style(Style::default().fg(Color::Cyan)),
            Cell::from(format_price(row.current_price)),
            Cell::from(value_text).style(change_style(value)),
        ])
    });

    f.render_widget(
        Table::new(
            body,
            [
                Constraint::Length(4),
                Constraint::Percentage(30),
                Constraint::Percentage(35),
                Constraint::Percentage(30),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title.to_string())),
        area,
    );
}

fn render_detail_table(f: &mut Frame, rows: &[AssetSnapshotRow], area: Rect) {
    let header = Row::new(DETAIL_COLUMNS).style(Style::default().bg(Color::DarkGray));
    let body = rows.iter().map(|row| {
        let changes = [row.pct_change_1h, row.pct_change_24h, row.pct_change_7d];
        let cells = detail_cells(row).into_iter().enumerate().map(move |(i, text)| {
            let cell = Cell::from(text);
            if i >= 5 { cell.style(change_style(changes[i - 5])) } else { cell }
        });
        Row::new(cells)
    });

    f.render_widget(
        Table::new(
            body,
            [
                Constraint::Length(8),
                Constraint::Percentage(20),
                Constraint::Length(14),
                Constraint::Length(10),
                Constraint::Length(10),
                Constraint::Length(9),
                Constraint::Length(9),
                Constraint::Length(9),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Details")),
        area,
    );
}

fn render_history(f: &mut Frame, view: &HistoryView, area: Rect) {
    let chart = &view.chart;
    if chart.is_empty() {
        let message = format!("No price history available for {}.", view.coin.name);
        render_notice(f, &message, area);
        return;
    }

    let data: Vec<(f64, f64)> = chart
        .points
        .iter()
        .map(|(date, price)| (date.timestamp() as f64, *price))
        .collect();
    let (first_date, last_date) = (chart.points[0].0, chart.points[chart.points.len() - 1].0);
    let mut x_bounds = [data[0].0, data[data.len() - 1].0];
    if x_bounds[0] == x_bounds[1] {
        x_bounds = [x_bounds[0] - 86_400.0, x_bounds[1] + 86_400.0];
    }
    let y_min = data.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let y_max = data.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    let pad = ((y_max - y_min) * 0.05).max(y_max.abs() * 0.01).max(f64::EPSILON);
    let y_bounds = [y_min - pad, y_max + pad];

    let dataset = Dataset::default()
        .name(view.coin.name.clone())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data);

    let x_labels = vec![
        Span::raw(first_date.format("%Y-%m-%d").to_string()),
        Span::raw(last_date.format("%Y-%m-%d").to_string()),
    ];
    let y_labels = vec![
        Span::raw(format_price(y_min)),
        Span::raw(format_price((y_min + y_max) / 2.0)),
        Span::raw(format_price(y_max)),
    ];

    f.render_widget(
        Chart::new(vec![dataset])
            .block(Block::default().borders(Borders::ALL).title(chart.title.clone()))
            .x_axis(Axis::default().title("Date").bounds(x_bounds).labels(x_labels))
            .y_axis(
                Axis::default()
                    .title(chart.y_label.clone())
                    .bounds(y_bounds)
                    .labels(y_labels),
            ),
        area,
    );
}

/// Splits `area` into one rectangle per weight, proportional to weight. Larger weights
/// are placed first; each step halves the remaining set by weight and cuts along the
/// longer side (terminal cells are about twice as tall as wide).
fn layout_treemap(weights: &[f64], area: Rect) -> Vec<Rect> {
    let mut rects = vec![Rect::default(); weights.len()];
    let mut order: Vec<(usize, f64)> = weights.iter().map(|w| w.max(0.0)).enumerate().collect();
    order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    split_tiles(&order, area, &mut rects);
    rects
}

fn split_tiles(items: &[(usize, f64)], area: Rect, out: &mut [Rect]) {
    if items.is_empty() || area.width == 0 || area.height == 0 {
        return;
    }
    if let [(idx, _)] = items {
        out[*idx] = area;
        return;
    }

    let total: f64 = items.iter().map(|(_, w)| w).sum();
    let mut cut = 1;
    let mut acc = 0.0;
    for (i, (_, w)) in items[..items.len() - 1].iter().enumerate() {
        acc += w;
        cut = i + 1;
        if acc * 2.0 >= total {
            break;
        }
    }
    let ratio = if total > 0.0 {
        items[..cut].iter().map(|(_, w)| w).sum::<f64>() / total
    } else {
        cut as f64 / items.len() as f64
    };

    let (first, second) = if area.width as f64 >= area.height as f64 * 2.0 {
        let w = ((area.width as f64 * ratio).round() as u16).min(area.width);
        (
            Rect::new(area.x, area.y, w, area.height),
            Rect::new(area.x + w, area.y, area.width - w, area.height),
        )
    } else {
        let h = ((area.height as f64 * ratio).round() as u16).min(area.height);
        (
            Rect::new(area.x, area.y, area.width, h),
            Rect::new(area.x, area.y + h, area.width, area.height - h),
        )
    };

    split_tiles(&items[..cut], first, out);
    split_tiles(&items[cut..], second, out);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(r);
    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}
