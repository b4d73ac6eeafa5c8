#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

// Core modules
pub mod analysis;
pub mod app;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod models;
pub mod utils;

// Re-export commonly used types outside of crate (for the binaries and tests)
pub use analysis::{DirectionalChangeDetector, Selection, ThresholdSelector, detect};
pub use config::{ANALYSIS, PERSISTENCE, Threshold};
pub use domain::PriceSeries;
pub use engine::{AnalysisReport, regime_aware_mean_reversion, run_analysis};
pub use error::{RegimeError, RegimeResult};
pub use models::{ChangeEvent, Direction, GaussianHmm, Signal};

// CLI argument parsing
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: app::Command,

    /// Emit JSON instead of tables
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,
}
