//! Analysis and computation configuration

use serde::{Deserialize, Serialize};

use super::types::{ObservationMode, ThresholdGrid};

/// Settings for the Gaussian HMM trainer.
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct HmmSettings {
    /// Number of latent regimes.
    pub n_states: usize,
    /// EM iteration cap.
    pub n_iter: usize,
    /// Stop once the log-likelihood gain of one EM step drops below this.
    pub tol: f64,
    /// Seed for the k-means initialisation of state means.
    pub seed: u64,
    /// Floor added to every state variance so a state can never collapse onto one point.
    pub min_variance: f64,
}

/// Supertrend overlay parameters
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupertrendSettings {
    pub window: usize,
    pub multiplier: f64,
}

/// Backtest annualisation settings
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestSettings {
    /// Trading periods per year (252 for daily bars).
    pub periods_per_year: usize,
    /// Annual risk-free rate used for excess returns.
    pub risk_free_rate: f64,
}

/// The Master Analysis Configuration
#[derive(Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    // Threshold candidates for the selector
    pub threshold_grid: ThresholdGrid,
    // Threshold used by the signal generator when no search is run
    pub dc_threshold: f64,
    // Moving-average width for the mean-reversion signal
    pub sma_window: usize,
    pub observation_mode: ObservationMode,
    // Evaluate threshold candidates on the rayon pool
    pub parallel_search: bool,

    // Sub-groups
    pub hmm: HmmSettings,
    pub supertrend: SupertrendSettings,
    pub backtest: BacktestSettings,
}

pub const ANALYSIS: AnalysisConfig = AnalysisConfig {
    // 0.5% .. 5% in 10 steps
    threshold_grid: ThresholdGrid::new(0.005, 0.05, 10),
    dc_threshold: 0.01,
    sma_window: 20,
    observation_mode: ObservationMode::EventReturns,
    parallel_search: false,

    hmm: HmmSettings {
        n_states: 2,
        n_iter: 100,
        tol: 1e-4,
        seed: 42,
        // Daily log-returns have variance ~1e-4, so the floor must sit well below that
        min_variance: 1e-8,
    },

    supertrend: SupertrendSettings {
        window: 10,
        multiplier: 3.0,
    },

    backtest: BacktestSettings {
        periods_per_year: 252,
        risk_free_rate: 0.0,
    },
};

impl Default for AnalysisConfig {
    fn default() -> Self {
        ANALYSIS
    }
}

impl Default for HmmSettings {
    fn default() -> Self {
        ANALYSIS.hmm
    }
}

impl Default for BacktestSettings {
    fn default() -> Self {
        ANALYSIS.backtest
    }
}

impl Default for SupertrendSettings {
    fn default() -> Self {
        ANALYSIS.supertrend
    }
}
