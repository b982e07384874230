//! screener-cli: rank a universe by factor score or run the funnel over it,
//! reading a market-data snapshot directory and printing JSON.
//!
//! Usage:
//!   screener-cli score                           # default factors, whole snapshot
//!   screener-cli score --config factors.json --top 20
//!   screener-cli score --symbols AAPL MSFT KO
//!   screener-cli funnel                          # moat universe
//!   screener-cli funnel --symbols NVDA AMD --concurrency 4
//!   screener-cli check NVDA

use anyhow::{bail, Context};
use factor_scoring::{prepare_records, score_batch, top_n, FactorConfig, ScoredStock, StockRecord, REQUIRED_FACTORS};
use funnel_strategy::{moat_symbols, FunnelStrategy, FunnelThresholds, DEFAULT_CONCURRENCY};
use market_data::SnapshotStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_TOP: usize = 10;

#[derive(Serialize)]
struct ScoreOutput {
    total_ranked: usize,
    dropped: usize,
    results: Vec<ScoredStock>,
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

/// Everything after `--symbols` up to the next flag.
fn symbols_arg(args: &[String]) -> Option<Vec<String>> {
    let idx = args.iter().position(|a| a == "--symbols")?;
    Some(
        args[idx + 1..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str, default: T) -> anyhow::Result<T> {
    match flag_value(args, flag) {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} expects a number, got {:?}", flag, raw)),
        None => Ok(default),
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  screener-cli score [--config FILE] [--top N] [--symbols A B ...]");
    eprintln!("  screener-cli funnel [--symbols A B ...] [--concurrency N]");
    eprintln!("  screener-cli check SYMBOL");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --snapshot DIR     Snapshot directory (default: $SNAPSHOT_DIR or data/snapshot)");
    eprintln!("  --config FILE      Factor config JSON (default: $FACTOR_CONFIG_PATH or built-in)");
    eprintln!("  --top N            Rows to print (default: {})", DEFAULT_TOP);
    eprintln!("  --concurrency N    Max parallel symbols (default: {})", DEFAULT_CONCURRENCY);
}

/// `--config` wins over `FACTOR_CONFIG_PATH`; neither means the built-in factors.
fn factor_config_path(args: &[String]) -> Option<PathBuf> {
    flag_value(args, "--config")
        .map(PathBuf::from)
        .or_else(|| std::env::var("FACTOR_CONFIG_PATH").ok().map(PathBuf::from))
}

async fn run_score(store: &SnapshotStore, args: &[String]) -> anyhow::Result<ScoreOutput> {
    let config = FactorConfig::load(factor_config_path(args).as_deref())
        .context("Failed to load factor config")?;
    let top: usize = parse_flag(args, "--top", DEFAULT_TOP)?;

    let records: Vec<StockRecord> = match symbols_arg(args) {
        Some(symbols) => {
            let wanted: Vec<_> = store
                .records()
                .into_iter()
                .filter(|r| symbols.contains(&r.symbol))
                .collect();
            if wanted.len() < symbols.len() {
                tracing::warn!("{} of {} symbols found in snapshot", wanted.len(), symbols.len());
            }
            wanted.iter().map(StockRecord::from_fundamentals).collect()
        }
        None => store.records().iter().map(StockRecord::from_fundamentals).collect(),
    };

    let submitted = records.len();
    let prepared = prepare_records(records, REQUIRED_FACTORS);
    let dropped = submitted - prepared.len();

    let scored = score_batch(&prepared, &config)?;
    let total_ranked = scored.len();
    tracing::info!("Ranked {} stocks ({} dropped)", total_ranked, dropped);

    Ok(ScoreOutput {
        total_ranked,
        dropped,
        results: top_n(scored, top),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "screener_cli=info,funnel_strategy=info,market_data=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(|s| s.as_str()) else {
        print_usage();
        std::process::exit(1);
    };

    let snapshot_dir: PathBuf = flag_value(&args, "--snapshot")
        .map(PathBuf::from)
        .or_else(|| std::env::var("SNAPSHOT_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data/snapshot"));

    let concurrency: usize = parse_flag(&args, "--concurrency", DEFAULT_CONCURRENCY)?;
    let thresholds = FunnelThresholds::from_env()?;

    let store = Arc::new(SnapshotStore::open(&snapshot_dir).await?);
    let funnel = FunnelStrategy::new(store.clone(), store.clone())
        .with_thresholds(thresholds)
        .with_concurrency(concurrency);

    let output = match command {
        "score" => serde_json::to_string_pretty(&run_score(&store, &args).await?)?,
        "funnel" => {
            let symbols = symbols_arg(&args).unwrap_or_else(moat_symbols);
            serde_json::to_string_pretty(&funnel.scan_report(&symbols).await)?
        }
        "check" => {
            let Some(symbol) = args.get(1).filter(|s| !s.starts_with("--")) else {
                bail!("check needs a SYMBOL");
            };
            serde_json::to_string_pretty(&funnel.analyze_single(symbol).await)?
        }
        other => {
            print_usage();
            bail!("unknown command {:?}", other);
        }
    };

    println!("{}", output);
    Ok(())
}
