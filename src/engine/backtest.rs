//! Close-to-close backtest of a position series.
//!
//! # Approach
//! The position for bar `i` is decided on the close of bar `i - 1` and held over
//! bar `i`, so `r[i] = signal[i - 1] * (p[i] / p[i - 1] - 1)` and `r[0] = 0`.
//! No costs, no slippage, unit notional. Entry point: [`run_backtest`];
//! [`compare_strategies`] runs the plain and regime-aware rules side by side.

use serde::{Deserialize, Serialize};

use crate::{
    analysis::simple_returns,
    config::BacktestSettings,
    engine::signals::{regime_aware_mean_reversion, simple_mean_reversion},
    error::{RegimeError, RegimeResult},
    models::Signal,
    utils::mean_and_stddev,
};

// ─── Return arithmetic ────────────────────────────────────────────────────────

pub fn strategy_returns(prices: &[f64], signals: &[Signal]) -> RegimeResult<Vec<f64>> {
    if prices.len() != signals.len() {
        return Err(RegimeError::invalid(
            "signals",
            format!(
                "{} signals for {} prices",
                signals.len(),
                prices.len()
            ),
        ));
    }
    if prices.is_empty() {
        return Ok(Vec::new());
    }

    // bar_returns[i - 1] is the move into bar i
    let bar_returns = simple_returns(prices);
    Ok(std::iter::once(0.0)
        .chain(
            signals
                .iter()
                .zip(bar_returns)
                .map(|(signal, r)| signal.as_f64() * r),
        )
        .collect())
}

/// Running `prod(1 + r) - 1`.
pub fn cumulative_profitability(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |wealth, r| {
            *wealth *= 1.0 + r;
            Some(*wealth - 1.0)
        })
        .collect()
}

/// Annualised Sharpe ratio over per-period returns.
///
/// `risk_free_rate` is annual and is spread evenly over `periods_per_year`.
/// Uses the sample standard deviation; 0.0 when it is zero or undefined.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: usize) -> f64 {
    let per_period_rf = risk_free_rate / periods_per_year as f64;
    let excess: Vec<f64> = returns.iter().map(|r| r - per_period_rf).collect();
    let (mean, std) = mean_and_stddev(&excess, 1);
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }
    (periods_per_year as f64).sqrt() * mean / std
}

// ─── Reports ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub name: String,
    pub periods: usize,
    /// Final cumulative profitability (fractional, e.g. 0.02 = +2 %)
    pub total_return: f64,
    pub sharpe_ratio: f64,
    /// Bars where the position differs from the previous bar
    pub position_changes: usize,
    /// Fraction of bars holding a long or short position
    pub exposure: f64,
    pub cumulative: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub simple: BacktestReport,
    pub regime_aware: BacktestReport,
}

impl StrategyComparison {
    pub fn reports(&self) -> [&BacktestReport; 2] {
        [&self.simple, &self.regime_aware]
    }
}

pub fn run_backtest(
    name: &str,
    prices: &[f64],
    signals: &[Signal],
    settings: &BacktestSettings,
) -> RegimeResult<BacktestReport> {
    if settings.periods_per_year == 0 {
        return Err(RegimeError::invalid("periods_per_year", "must be at least 1"));
    }

    let returns = strategy_returns(prices, signals)?;
    let cumulative = cumulative_profitability(&returns);
    let total_return = cumulative.last().copied().unwrap_or(0.0);
    let sharpe = sharpe_ratio(&returns, settings.risk_free_rate, settings.periods_per_year);

    let position_changes = signals.windows(2).filter(|w| w[0] != w[1]).count();
    let exposure = if signals.is_empty() {
        0.0
    } else {
        signals.iter().filter(|s| **s != Signal::Flat).count() as f64 / signals.len() as f64
    };

    log::info!(
        "[backtest] {} | periods={} | total_return={:+.4} | sharpe={:.4} | changes={} | exposure={:.1}%",
        name,
        returns.len(),
        total_return,
        sharpe,
        position_changes,
        exposure * 100.0,
    );

    Ok(BacktestReport {
        name: name.to_string(),
        periods: returns.len(),
        total_return,
        sharpe_ratio: sharpe,
        position_changes,
        exposure,
        cumulative,
    })
}

pub fn compare_strategies(
    prices: &[f64],
    window: usize,
    dc_threshold: f64,
    settings: &BacktestSettings,
) -> RegimeResult<StrategyComparison> {
    let simple_signals = simple_mean_reversion(prices, window)?;
    let regime_signals = regime_aware_mean_reversion(prices, window, dc_threshold)?;

    Ok(StrategyComparison {
        simple: run_backtest("simple", prices, &simple_signals, settings)?,
        regime_aware: run_backtest("regime-aware", prices, &regime_signals, settings)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn settings() -> BacktestSettings {
        BacktestSettings {
            periods_per_year: 252,
            risk_free_rate: 0.0,
        }
    }

    #[test]
    fn returns_use_previous_position() {
        let prices = [100.0, 110.0, 99.0, 99.0];
        let signals = [Signal::Long, Signal::Short, Signal::Flat, Signal::Long];
        let r = strategy_returns(&prices, &signals).unwrap();
        assert_eq!(r[0], 0.0);
        assert_relative_eq!(r[1], 0.1, epsilon = 1e-12);
        // Short over a 10% drop
        assert_relative_eq!(r[2], 0.1, epsilon = 1e-12);
        assert_eq!(r[3], 0.0);
    }

    #[test]
    fn always_long_earns_the_bar_returns() {
        let prices = [100.0, 104.0, 101.0, 103.0];
        let r = strategy_returns(&prices, &[Signal::Long; 4]).unwrap();
        assert_eq!(r[0], 0.0);
        assert_eq!(&r[1..], simple_returns(&prices).as_slice());
    }

    #[test]
    fn mismatched_lengths_rejected() {
        assert!(strategy_returns(&[1.0, 2.0], &[Signal::Flat]).is_err());
        assert_eq!(strategy_returns(&[], &[]).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn compounding() {
        let cum = cumulative_profitability(&[0.0, 0.1, -0.1]);
        assert_eq!(cum[0], 0.0);
        assert_relative_eq!(cum[1], 0.1, epsilon = 1e-12);
        assert_relative_eq!(cum[2], 1.1 * 0.9 - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn sharpe_known_value() {
        let r = [0.01, 0.02, 0.03];
        // mean 0.02, sample std 0.01
        assert_relative_eq!(sharpe_ratio(&r, 0.0, 252), 252f64.sqrt() * 2.0, epsilon = 1e-9);
    }

    #[test]
    fn sharpe_zero_when_flat() {
        assert_eq!(sharpe_ratio(&[0.0; 10], 0.0, 252), 0.0);
        assert_eq!(sharpe_ratio(&[0.05], 0.0, 252), 0.0);
        assert_eq!(sharpe_ratio(&[], 0.0, 252), 0.0);
    }

    #[test]
    fn risk_free_rate_is_deannualised() {
        let r = [0.01, 0.02, 0.03];
        let with_rf = sharpe_ratio(&r, 0.252, 252);
        // Excess mean drops by 0.001, std unchanged
        assert_relative_eq!(with_rf, 252f64.sqrt() * 1.9, epsilon = 1e-9);
    }

    #[test]
    fn report_statistics() {
        let prices = [100.0, 110.0, 99.0, 99.0];
        let signals = [Signal::Long, Signal::Short, Signal::Flat, Signal::Flat];
        let report = run_backtest("t", &prices, &signals, &settings()).unwrap();
        assert_eq!(report.periods, 4);
        assert_eq!(report.position_changes, 2);
        assert_relative_eq!(report.exposure, 0.5, epsilon = 1e-12);
        assert_relative_eq!(report.total_return, 1.1 * 1.1 - 1.0, epsilon = 1e-12);
        assert_eq!(report.cumulative.len(), 4);
    }

    #[test]
    fn comparison_runs_both() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.5).sin() * 4.0).collect();
        let cmp = compare_strategies(&prices, 5, 0.02, &settings()).unwrap();
        assert_eq!(cmp.simple.name, "simple");
        assert_eq!(cmp.regime_aware.name, "regime-aware");
        assert_eq!(cmp.simple.periods, prices.len());
    }
}
