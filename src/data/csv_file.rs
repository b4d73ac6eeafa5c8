//! Daily price CSV files.
//!
//! Columns are found by header name (case-insensitive): a `Date`/`Timestamp`/`Time`
//! column and a `Close` column are required; `Open`, `High`, `Low` and `Volume`
//! are optional and fall back to the close (volume to 0). Rows may come in any
//! order; they are sorted by timestamp before validation.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;

use crate::{
    data::{PriceSource, create_file_with_parents},
    domain::{Candle, PriceSeries},
    utils::{epoch_ms_to_date_string, parse_timestamp_ms},
};

struct Columns {
    timestamp: usize,
    close: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    volume: Option<usize>,
}

impl Columns {
    fn detect(headers: &csv::StringRecord) -> Result<Self> {
        let lower: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |names: &[&str]| lower.iter().position(|h| names.contains(&h.as_str()));

        let timestamp = find(&["date", "timestamp", "time", "datetime"])
            .or_else(|| lower.iter().position(|h| h.contains("timestamp")))
            .ok_or_else(|| anyhow!("No date/timestamp column in header {:?}", lower))?;
        let close = find(&["close", "adj close", "adj_close"])
            .ok_or_else(|| anyhow!("No close column in header {:?}", lower))?;

        Ok(Self {
            timestamp,
            close,
            open: find(&["open"]),
            high: find(&["high"]),
            low: find(&["low"]),
            volume: find(&["volume"]),
        })
    }
}

fn field(record: &csv::StringRecord, col: usize, row: usize, name: &str) -> Result<f64> {
    let raw = record
        .get(col)
        .ok_or_else(|| anyhow!("Row {}: missing {} field", row, name))?;
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("Row {}: bad {} value '{}'", row, name, raw))
}

/// Parse CSV text from any reader into a validated series.
pub fn parse_prices_csv<R: Read>(reader: R, symbol: &str) -> Result<PriceSeries> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers().context("Failed to read CSV header")?.clone();
    let cols = Columns::detect(&headers)?;

    let mut candles = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        // Header is line 1
        let row = i + 2;
        let record = result.with_context(|| format!("Row {}: malformed record", row))?;

        let ts_raw = record
            .get(cols.timestamp)
            .ok_or_else(|| anyhow!("Row {}: missing timestamp", row))?;
        let timestamp_ms =
            parse_timestamp_ms(ts_raw).with_context(|| format!("Row {}: bad timestamp", row))?;

        let close = field(&record, cols.close, row, "close")?;
        let optional = |col: Option<usize>, name: &str, fallback: f64| match col {
            Some(c) => field(&record, c, row, name),
            None => Ok(fallback),
        };

        candles.push(Candle::new(
            timestamp_ms,
            optional(cols.open, "open", close)?,
            optional(cols.high, "high", close)?,
            optional(cols.low, "low", close)?,
            close,
            optional(cols.volume, "volume", 0.0)?,
        ));
    }

    candles.sort_by_key(|c| c.timestamp_ms);
    let series = PriceSeries::from_candles(symbol, candles)?;
    Ok(series)
}

pub fn read_prices_csv(path: &Path, symbol: &str) -> Result<PriceSeries> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open price file: {}", path.display()))?;
    parse_prices_csv(std::io::BufReader::new(file), symbol)
        .with_context(|| format!("Failed to parse price file: {}", path.display()))
}

#[derive(Serialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Open")]
    open: f64,
    #[serde(rename = "High")]
    high: f64,
    #[serde(rename = "Low")]
    low: f64,
    #[serde(rename = "Close")]
    close: f64,
    #[serde(rename = "Volume")]
    volume: f64,
}

/// Write `Date,Open,High,Low,Close,Volume`, oldest first.
pub fn write_prices_csv(path: &Path, series: &PriceSeries) -> Result<()> {
    let file = create_file_with_parents(path)?;
    let mut wtr = csv::Writer::from_writer(file);
    for c in series.candles() {
        wtr.serialize(CsvRow {
            date: epoch_ms_to_date_string(c.timestamp_ms),
            open: c.open_price,
            high: c.high_price,
            low: c.low_price,
            close: c.close_price,
            volume: c.volume,
        })
        .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    log::info!("Wrote {} rows to {}", series.len(), path.display());
    Ok(())
}

pub struct CsvPriceFile {
    pub path: PathBuf,
    pub symbol: String,
}

impl CsvPriceFile {
    pub fn new(path: impl Into<PathBuf>, symbol: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            symbol: symbol.into(),
        }
    }
}

#[async_trait]
impl PriceSource for CsvPriceFile {
    fn signature(&self) -> &'static str {
        "CSV File"
    }

    async fn load(&self) -> Result<PriceSeries> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read price file: {}", self.path.display()))?;
        let series = parse_prices_csv(bytes.as_slice(), &self.symbol)
            .with_context(|| format!("Failed to parse price file: {}", self.path.display()))?;
        log::info!(
            "Loaded {} prices for {} from {}",
            series.len(),
            series.symbol,
            self.path.display()
        );
        Ok(series)
    }
}
