use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

use dc_regime::config::{
    ALPHA_VANTAGE_KEY_VAR, AlphaVantageConfig, OutputSize, PERSISTENCE, price_cache_filename,
    price_csv_filename,
};
use dc_regime::data::{AlphaVantageClient, PriceSource, write_price_cache, write_prices_csv};
use dc_regime::utils::{TimeUtils, epoch_ms_to_date_string};

/// Download daily prices from Alpha Vantage into the local price directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Ticker, e.g. IBM
    #[arg(long)]
    symbol: String,

    /// First date kept (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<String>,

    /// Last date kept (YYYY-MM-DD)
    #[arg(long)]
    end_date: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputSize::Compact)]
    output_size: OutputSize,

    /// API key; falls back to the ALPHAVANTAGE_API_KEY environment variable
    #[arg(long)]
    api_key: Option<String>,

    /// Output directory
    #[arg(long, default_value = PERSISTENCE.price.directory)]
    out_dir: PathBuf,
}

fn parse_date(raw: &Option<String>) -> Result<Option<NaiveDate>> {
    raw.as_deref()
        .map(|s| {
            NaiveDate::parse_from_str(s, TimeUtils::STANDARD_TIME_FORMAT)
                .with_context(|| format!("Bad date '{}', expected YYYY-MM-DD", s))
        })
        .transpose()
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Setup Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // 2. Explicit config; the environment is only consulted here
    let api_key = match args.api_key {
        Some(key) => key,
        None => std::env::var(ALPHA_VANTAGE_KEY_VAR)
            .with_context(|| format!("Pass --api-key or set {}", ALPHA_VANTAGE_KEY_VAR))?,
    };
    let config = AlphaVantageConfig::new(api_key, args.symbol.clone())
        .with_output_size(args.output_size)
        .with_date_range(parse_date(&args.start_date)?, parse_date(&args.end_date)?);

    // 3. Fetch
    let client = AlphaVantageClient::new(config)?;
    let series = client
        .load()
        .await
        .with_context(|| format!("Failed to fetch {}", args.symbol))?;

    log::info!(
        "{} bars for {}: {} .. {}",
        series.len(),
        series.symbol,
        series.timestamps.first().map(|&t| epoch_ms_to_date_string(t)).unwrap_or_default(),
        series.timestamps.last().map(|&t| epoch_ms_to_date_string(t)).unwrap_or_default(),
    );

    // 4. Save CSV and binary cache side by side
    let csv_path = args.out_dir.join(price_csv_filename(&args.symbol));
    write_prices_csv(&csv_path, &series)?;

    let cache_path = args.out_dir.join(price_cache_filename(&args.symbol));
    write_price_cache(&cache_path, &series)?;

    log::info!("Done: {} and {}", csv_path.display(), cache_path.display());
    Ok(())
}
