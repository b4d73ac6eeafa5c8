//! Alpha Vantage `TIME_SERIES_DAILY` client.
//!
//! The API key is part of [`AlphaVantageConfig`]; this module never reads the
//! environment.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    config::AlphaVantageConfig,
    data::PriceSource,
    domain::{Candle, PriceSeries},
    utils::{TimeUtils, date_to_epoch_ms},
};

const DAILY_FUNCTION: &str = "TIME_SERIES_DAILY";

#[derive(Debug, Deserialize)]
struct DailyResponse {
    #[serde(rename = "Time Series (Daily)")]
    series: Option<BTreeMap<String, DailyBar>>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    /// Rate-limit notice
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

fn parse_f64(s: &str, what: &str, date: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .with_context(|| format!("{}: bad {} value '{}'", date, what, s))
}

/// Turn a daily-series JSON body into a series, oldest first, keeping only
/// dates inside the inclusive `[start, end]` range.
pub fn parse_daily_response(
    body: &str,
    symbol: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<PriceSeries> {
    let response: DailyResponse =
        serde_json::from_str(body).context("Alpha Vantage response is not valid JSON")?;

    let Some(bars) = response.series else {
        let reason = response
            .error_message
            .or(response.note)
            .or(response.information)
            .unwrap_or_else(|| "no daily time series in response".to_string());
        bail!("Could not retrieve data for {}: {}", symbol, reason);
    };

    let mut candles = Vec::with_capacity(bars.len());
    // BTreeMap over ISO dates iterates chronologically
    for (date_str, bar) in &bars {
        let date = NaiveDate::parse_from_str(date_str, TimeUtils::STANDARD_TIME_FORMAT)
            .with_context(|| format!("Bad date key '{}'", date_str))?;
        if start.is_some_and(|s| date < s) || end.is_some_and(|e| date > e) {
            continue;
        }
        candles.push(Candle::new(
            date_to_epoch_ms(date),
            parse_f64(&bar.open, "open", date_str)?,
            parse_f64(&bar.high, "high", date_str)?,
            parse_f64(&bar.low, "low", date_str)?,
            parse_f64(&bar.close, "close", date_str)?,
            parse_f64(&bar.volume, "volume", date_str)?,
        ));
    }

    if candles.is_empty() {
        bail!(
            "No data for {} in range {:?}..={:?} ({} bars downloaded)",
            symbol,
            start,
            end,
            bars.len()
        );
    }

    Ok(PriceSeries::from_candles(symbol, candles)?)
}

pub struct AlphaVantageClient {
    config: AlphaVantageConfig,
    http: reqwest::Client,
}

impl AlphaVantageClient {
    pub fn new(config: AlphaVantageConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            bail!("Alpha Vantage API key is empty");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, http })
    }

    async fn fetch_body(&self) -> Result<String> {
        let output_size = self.config.output_size.to_string();
        let query = [
            ("function", DAILY_FUNCTION),
            ("symbol", self.config.symbol.as_str()),
            ("outputsize", output_size.as_str()),
            ("apikey", self.config.api_key.as_str()),
        ];

        log::info!(
            "Fetching {} ({}) from {}",
            self.config.symbol,
            output_size,
            self.config.base_url
        );

        let resp = self
            .http
            .get(&self.config.base_url)
            .query(&query)
            .send()
            .await
            .with_context(|| format!("GET {}", self.config.base_url))?
            .error_for_status()
            .context("non-200 from Alpha Vantage")?;

        resp.text().await.context("Failed to read Alpha Vantage response body")
    }
}

#[async_trait]
impl PriceSource for AlphaVantageClient {
    fn signature(&self) -> &'static str {
        "Alpha Vantage API"
    }

    async fn load(&self) -> Result<PriceSeries> {
        let body = self.fetch_body().await?;
        let series = parse_daily_response(
            &body,
            &self.config.symbol,
            self.config.start_date,
            self.config.end_date,
        )?;
        log::info!("Fetched {} daily bars for {}", series.len(), series.symbol);
        Ok(series)
    }
}
