//! Market-data fetch configuration.
//!
//! Built explicitly for each fetch and handed to the client; nothing here is global.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

pub const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const ALPHA_VANTAGE_KEY_VAR: &str = "ALPHAVANTAGE_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, ValueEnum)]
pub enum OutputSize {
    /// Latest 100 bars
    #[default]
    #[strum(to_string = "compact")]
    Compact,
    /// Full history
    #[strum(to_string = "full")]
    Full,
}

#[derive(Debug, Clone)]
pub struct AlphaVantageConfig {
    pub api_key: String,
    pub base_url: String,
    pub symbol: String,
    pub output_size: OutputSize,
    /// Inclusive date filter applied after download
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub timeout_secs: u64,
}

impl AlphaVantageConfig {
    pub fn new(api_key: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: ALPHA_VANTAGE_BASE_URL.to_string(),
            symbol: symbol.into(),
            output_size: OutputSize::default(),
            start_date: None,
            end_date: None,
            timeout_secs: 30,
        }
    }

    pub fn with_output_size(mut self, output_size: OutputSize) -> Self {
        self.output_size = output_size;
        self
    }

    pub fn with_date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }
}
