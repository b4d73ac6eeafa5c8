//! Configuration module for the dc-regime toolkit.

mod analysis;
mod fetch;
mod persistence;
mod types;

// Log candidate evaluations slower than the trace_time! threshold
pub const LOG_PERFORMANCE: bool = cfg!(debug_assertions);

// Re-export commonly used items
pub use analysis::{ANALYSIS, AnalysisConfig, BacktestSettings, HmmSettings, SupertrendSettings};
pub use fetch::{ALPHA_VANTAGE_BASE_URL, ALPHA_VANTAGE_KEY_VAR, AlphaVantageConfig, OutputSize};
pub use persistence::{PERSISTENCE, price_cache_filename, price_csv_filename};
pub use types::{ObservationMode, Threshold, ThresholdGrid};
