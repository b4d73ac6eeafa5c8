use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::{
    config::{ANALYSIS, AnalysisConfig, HmmSettings, ObservationMode, ThresholdGrid},
    data::default_cache_path,
};

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List directional-change events at one threshold
    Detect {
        #[command(flatten)]
        input: InputArgs,

        /// Fractional threshold, e.g. 0.01 = 1%
        #[arg(long, default_value_t = ANALYSIS.dc_threshold)]
        threshold: f64,
    },

    /// Grid-search the DC threshold by regime-model fit
    Select {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        grid: GridArgs,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Select threshold, decode regimes and backtest, in one report
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        grid: GridArgs,

        #[command(flatten)]
        model: ModelArgs,

        /// SMA width for the mean-reversion signal
        #[arg(long, default_value_t = ANALYSIS.sma_window)]
        window: usize,
    },

    /// Compare plain and regime-aware mean reversion
    Backtest {
        #[command(flatten)]
        input: InputArgs,

        /// SMA width for the mean-reversion signal
        #[arg(long, default_value_t = ANALYSIS.sma_window)]
        window: usize,

        /// DC threshold driving the regime flips
        #[arg(long, default_value_t = ANALYSIS.dc_threshold)]
        threshold: f64,
    },

    /// Supertrend overlay values
    Supertrend {
        #[command(flatten)]
        input: InputArgs,

        /// ATR span
        #[arg(long, default_value_t = ANALYSIS.supertrend.window)]
        window: usize,

        /// Band width in ATRs
        #[arg(long, default_value_t = ANALYSIS.supertrend.multiplier)]
        multiplier: f64,

        /// Only print the most recent N rows
        #[arg(long)]
        tail: Option<usize>,
    },
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = true)]
pub struct InputArgs {
    /// Price file: `.csv`, or a `.bin` cache. Defaults to the symbol's cache
    /// in the price directory (as written by fetch_prices)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Symbol label (defaults to the file stem)
    #[arg(short, long)]
    pub symbol: Option<String>,
}

impl InputArgs {
    pub fn symbol(&self) -> String {
        if let Some(symbol) = &self.symbol {
            return symbol.clone();
        }
        self.input
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "UNKNOWN".to_string())
    }

    pub fn path(&self) -> PathBuf {
        match &self.input {
            Some(path) => path.clone(),
            None => default_cache_path(&self.symbol()),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct GridArgs {
    /// Explicit candidates, evaluated in the order given (overrides the grid)
    #[arg(long = "threshold", num_args = 1..)]
    pub thresholds: Vec<f64>,

    #[arg(long, default_value_t = ANALYSIS.threshold_grid.start)]
    pub grid_start: f64,

    #[arg(long, default_value_t = ANALYSIS.threshold_grid.end)]
    pub grid_end: f64,

    #[arg(long, default_value_t = ANALYSIS.threshold_grid.steps)]
    pub grid_steps: usize,

    /// Evaluate candidates on the rayon pool
    #[arg(long, default_value_t = false)]
    pub parallel: bool,
}

impl GridArgs {
    pub fn grid(&self) -> ThresholdGrid {
        ThresholdGrid::new(self.grid_start, self.grid_end, self.grid_steps)
    }

    pub fn candidates(&self) -> Vec<f64> {
        if self.thresholds.is_empty() {
            self.grid().values()
        } else {
            self.thresholds.clone()
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Number of hidden regimes
    #[arg(long, default_value_t = ANALYSIS.hmm.n_states)]
    pub states: usize,

    /// EM iteration cap
    #[arg(long, default_value_t = ANALYSIS.hmm.n_iter)]
    pub n_iter: usize,

    #[arg(long, default_value_t = ANALYSIS.hmm.seed)]
    pub seed: u64,

    /// Train on returns between DC events or on daily returns
    #[arg(long, value_enum, default_value_t = ANALYSIS.observation_mode)]
    pub mode: ObservationMode,
}

impl ModelArgs {
    pub fn hmm(&self) -> HmmSettings {
        HmmSettings {
            n_states: self.states,
            n_iter: self.n_iter,
            seed: self.seed,
            ..ANALYSIS.hmm
        }
    }
}

/// Fold CLI overrides into the master analysis config.
pub fn analysis_config(grid: &GridArgs, model: &ModelArgs, window: usize) -> AnalysisConfig {
    AnalysisConfig {
        threshold_grid: grid.grid(),
        sma_window: window,
        observation_mode: model.mode,
        parallel_search: grid.parallel,
        hmm: model.hmm(),
        ..ANALYSIS
    }
}
