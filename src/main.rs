use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use crypto_heatmap::coin_list::{find_coin, search_coins};
use crypto_heatmap::models::{CoinListEntry, Currency, Metric};
use crypto_heatmap::pipeline::{MarketServices, run_heatmap_cycle, run_history_cycle};
use crypto_heatmap::settings::DashboardConfig;
use crypto_heatmap::storage_utils::{AppConfig, AsyncStorageManager};
use crypto_heatmap::{table_view, tui};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "crypto-heatmap.log";

#[derive(Parser)]
#[command(name = "crypto-heatmap")]
#[command(about = "Crypto market heatmap and price history from the CoinGecko API", long_about = None)]
struct Cli {
    /// Directory holding config.json, the snapshot log and the TUI log
    /// (default: `storage` next to the binary)
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive heatmap / history dashboard (default)
    Dashboard,
    /// Fetch one market snapshot, print it and append it to the snapshot log
    Snapshot {
        /// Number of coins (10-100)
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(10..=100))]
        top_n: Option<u32>,
        #[arg(short, long, value_enum)]
        currency: Option<Currency>,
        /// Sort order of the detail table
        #[arg(short, long, value_enum)]
        sort: Option<Metric>,
        /// Metric used for the gainers/losers tables
        #[arg(short, long, value_enum)]
        rank_by: Option<Metric>,
        /// Rows in the gainers/losers tables
        #[arg(short, long)]
        limit: Option<usize>,
        /// Do not append to the snapshot log
        #[arg(long)]
        no_log: bool,
    },
    /// Print a three-year price history summary for one coin
    History {
        /// Coin id, name or symbol (e.g. "bitcoin", "Bitcoin", "btc")
        #[arg(long)]
        coin: String,
        #[arg(short, long, value_enum)]
        currency: Option<Currency>,
    },
    /// List coins whose id, symbol or name contains QUERY
    Coins { query: Option<String> },
}

fn init_tracing(log_file: Option<&Path>, default_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_file {
        // The TUI owns the terminal, so its logs go to a file.
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let storage = match &cli.storage_dir {
        Some(dir) => AsyncStorageManager::new(dir).await?,
        None => AsyncStorageManager::new_relative("storage").await?,
    };

    let command = cli.command.unwrap_or(Commands::Dashboard);
    match command {
        Commands::Dashboard => init_tracing(Some(&storage.path_for(LOG_FILE)), "info")?,
        _ => init_tracing(None, "warn")?,
    }

    let app_config: AppConfig = storage
        .load_or_init("config")
        .await
        .context("Failed to load config.json")?;

    match command {
        Commands::Dashboard => {
            let services = Arc::new(MarketServices::new(&app_config, &storage)?);
            let config = DashboardConfig::from_defaults(&app_config.defaults);
            tui::run_tui(services, config).await
        }
        Commands::Snapshot {
            top_n,
            currency,
            sort,
            rank_by,
            limit,
            no_log,
        } => {
            let mut config = DashboardConfig::from_defaults(&app_config.defaults);
            config.top_n = top_n.unwrap_or(config.top_n);
            config.currency = currency.unwrap_or(config.currency);
            config.sort_by = sort.unwrap_or(config.sort_by);
            config.rank_by = rank_by.unwrap_or(config.rank_by);
            config.rank_limit = limit.unwrap_or(config.rank_limit);

            let services = if no_log {
                MarketServices::with_snapshot_log(&app_config, None)?
            } else {
                MarketServices::new(&app_config, &storage)?
            };
            let view = run_heatmap_cycle(&services, &config).await?;
            table_view::print_heatmap(&view);
            if let Some(log) = &services.snapshot_log {
                println!("\nSnapshot appended to {:?}", log.path());
            }
            Ok(())
        }
        Commands::History { coin, currency } => {
            let services = MarketServices::with_snapshot_log(&app_config, None)?;
            let currency = currency.unwrap_or(app_config.defaults.currency);

            let entry = match services.coins.fetch().await {
                Ok(coins) => match find_coin(&coins, &coin) {
                    Some(entry) => entry.clone(),
                    None => bail!("No coin matches {:?}; try `crypto-heatmap coins {}`", coin, coin),
                },
                Err(e) => {
                    warn!("Coin list unavailable ({}), using {:?} as the coin id", e, coin);
                    CoinListEntry {
                        id: coin.clone(),
                        symbol: String::new(),
                        name: coin.clone(),
                    }
                }
            };

            let view = run_history_cycle(&services, &entry, currency).await;
            table_view::print_history(&view);
            Ok(())
        }
        Commands::Coins { query } => {
            let services = MarketServices::with_snapshot_log(&app_config, None)?;
            let coins = services.coins.fetch().await.context("Failed to fetch coin list")?;
            let matches = search_coins(&coins, query.as_deref().unwrap_or_default());
            println!("{}", table_view::coin_table(&matches));
            println!("{} of {} coins", matches.len(), coins.len());
            Ok(())
        }
    }
}
