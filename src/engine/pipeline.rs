//! End-to-end analysis of one price series.

use serde::{Deserialize, Serialize};

use crate::{
    analysis::{
        RegimeStats, Selection, ThresholdSelector, aligned_directions, summarize_regimes,
    },
    config::AnalysisConfig,
    domain::PriceSeries,
    engine::backtest::{StrategyComparison, compare_strategies},
    error::RegimeResult,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub n_prices: usize,
    pub selection: Selection,
    /// Viterbi path over the winning observations
    pub states: Vec<usize>,
    pub regimes: Vec<RegimeStats>,
    pub bic: f64,
    /// Simple vs regime-aware backtest at the selected threshold
    pub comparison: StrategyComparison,
}

pub fn run_analysis(series: &PriceSeries, config: &AnalysisConfig) -> RegimeResult<AnalysisReport> {
    series.validate()?;
    let prices = series.closes();
    let grid = config.threshold_grid.values();

    log::info!(
        "Analysing {} ({} prices) over {} threshold candidates [{}]",
        series.symbol,
        prices.len(),
        grid.len(),
        config.observation_mode
    );

    let selector = ThresholdSelector::new(config.hmm, config.observation_mode);
    let selection = if config.parallel_search {
        selector.select_parallel(prices, &grid)?
    } else {
        selector.select(prices, &grid)?
    };

    let model = &selection.model;
    let states = model.predict(&selection.observations)?;
    let directions = aligned_directions(config.observation_mode, prices.len(), &selection.events);
    let regimes = summarize_regimes(
        &selection.observations,
        &states,
        &directions,
        model.n_states,
    )?;
    let bic = model.bic(&selection.observations)?;

    let comparison = compare_strategies(
        prices,
        config.sma_window,
        selection.threshold.value(),
        &config.backtest,
    )?;

    Ok(AnalysisReport {
        symbol: series.symbol.clone(),
        n_prices: prices.len(),
        selection,
        states,
        regimes,
        bic,
        comparison,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ObservationMode, error::RegimeError};

    fn series(n: usize) -> PriceSeries {
        let mut p = 100.0;
        let closes: Vec<f64> = (0..n)
            .map(|i| {
                let drift = if (i / 15) % 2 == 0 { 0.004 } else { -0.004 };
                p *= 1.0 + drift + 0.012 * (i as f64 * 2.3).sin();
                p
            })
            .collect();
        let timestamps = (0..n as i64).map(|i| i * 86_400_000).collect();
        PriceSeries::from_closes("TEST", timestamps, closes).unwrap()
    }

    #[test]
    fn report_is_consistent() {
        let series = series(250);
        let report = run_analysis(&series, &AnalysisConfig::default()).unwrap();

        assert_eq!(report.n_prices, 250);
        assert_eq!(report.states.len(), report.selection.observations.len());
        assert_eq!(report.regimes.len(), 2);
        let samples: usize = report.regimes.iter().map(|r| r.samples).sum();
        assert_eq!(samples, report.states.len());
        assert_eq!(report.comparison.simple.periods, 250);
        assert!(report.bic.is_finite());
    }

    #[test]
    fn price_mode_covers_every_return() {
        let config = AnalysisConfig {
            observation_mode: ObservationMode::PriceReturns,
            ..AnalysisConfig::default()
        };
        let report = run_analysis(&series(120), &config).unwrap();
        assert_eq!(report.states.len(), 119);
    }

    #[test]
    fn parallel_search_agrees() {
        let series = series(200);
        let sequential = run_analysis(&series, &AnalysisConfig::default()).unwrap();
        let parallel = run_analysis(
            &series,
            &AnalysisConfig {
                parallel_search: true,
                ..AnalysisConfig::default()
            },
        )
        .unwrap();
        assert_eq!(sequential.selection.threshold, parallel.selection.threshold);
        assert_eq!(sequential.states, parallel.states);
    }

    #[test]
    fn tiny_series_has_no_viable_threshold() {
        let series = PriceSeries::from_closes("X", vec![0], vec![100.0]).unwrap();
        let err = run_analysis(&series, &AnalysisConfig::default()).unwrap_err();
        assert!(matches!(err, RegimeError::NoViableThreshold { candidates: 10 }));
    }
}
