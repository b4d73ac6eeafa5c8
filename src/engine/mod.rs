pub mod backtest;
pub mod pipeline;
pub mod signals;

pub use backtest::{
    BacktestReport, StrategyComparison, compare_strategies, cumulative_profitability, run_backtest,
    sharpe_ratio, strategy_returns,
};
pub use pipeline::{AnalysisReport, run_analysis};
pub use signals::{regime_aware_from_events, regime_aware_mean_reversion, simple_mean_reversion};
