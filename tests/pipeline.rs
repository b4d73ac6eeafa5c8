//! End-to-end: CSV on disk -> loader -> threshold search -> regimes -> backtest.

use std::io::Write;

use approx::assert_relative_eq;
use dc_regime::{
    ANALYSIS, GaussianHmm, PERSISTENCE, PriceSeries, RegimeError, ThresholdSelector, detect,
    analysis::event_log_returns,
    config::{AnalysisConfig, ObservationMode},
    data::{CsvPriceFile, PriceCacheFile, PriceSource, read_price_cache, write_price_cache},
    run_analysis,
};

/// Alternating 20-day drifts with a deterministic wobble, so every grid value sees events.
fn closes(n: usize) -> Vec<f64> {
    let mut p = 100.0;
    (0..n)
        .map(|i| {
            let drift = if (i / 20) % 2 == 0 { 0.005 } else { -0.005 };
            p *= 1.0 + drift + 0.011 * (i as f64 * 1.7).sin();
            p
        })
        .collect()
}

fn write_csv(dir: &std::path::Path, closes: &[f64]) -> std::path::PathBuf {
    let path = dir.join("TEST.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "Date,Open,High,Low,Close,Volume").unwrap();
    // Newest first, the way most vendors export
    for (i, c) in closes.iter().enumerate().rev() {
        let day = chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Days::new(i as u64);
        writeln!(file, "{},{c},{},{},{c},1000", day.format("%Y-%m-%d"), c * 1.01, c * 0.99).unwrap();
    }
    path
}

#[tokio::test]
async fn csv_to_report() {
    let dir = tempfile::tempdir().unwrap();
    let prices = closes(300);
    let path = write_csv(dir.path(), &prices);

    let series = CsvPriceFile::new(&path, "TEST").load().await.unwrap();
    assert_eq!(series.len(), 300);
    for (a, b) in series.closes().iter().zip(&prices) {
        assert_relative_eq!(*a, *b, max_relative = 1e-12);
    }

    let report = run_analysis(&series, &ANALYSIS).unwrap();
    assert_eq!(report.symbol, "TEST");
    assert!(
        report
            .selection
            .candidates
            .iter()
            .any(|c| c.threshold == report.selection.threshold.value())
    );
    let best = report
        .selection
        .candidates
        .iter()
        .filter(|c| c.is_viable())
        .map(|c| c.score)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(report.selection.score, best);
    assert_eq!(report.comparison.regime_aware.periods, 300);
}

#[test]
fn parallel_and_sequential_pick_the_same_threshold() {
    let prices = closes(250);
    let grid = ANALYSIS.threshold_grid.values();
    let selector = ThresholdSelector::default();

    let a = selector.select(&prices, &grid).unwrap();
    let b = selector.select_parallel(&prices, &grid).unwrap();
    assert_eq!(a.threshold, b.threshold);
    assert_eq!(a.score, b.score);
    assert_eq!(a.candidates, b.candidates);
}

#[test]
fn single_candidate_matches_direct_fit() {
    let prices = closes(250);
    let selector = ThresholdSelector::default();
    let selection = selector.select(&prices, &[0.02]).unwrap();

    assert_eq!(selection.threshold.value(), 0.02);
    assert_eq!(
        selection.observations,
        event_log_returns(&selection.events).unwrap()
    );
    let rescored = selection.model.score(&selection.observations).unwrap();
    assert_relative_eq!(rescored, selection.score, max_relative = 1e-12);

    // Same as running the detector and trainer by hand
    let events = detect(&prices, 0.02).unwrap();
    let model = GaussianHmm::train(&event_log_returns(&events).unwrap(), &ANALYSIS.hmm).unwrap();
    assert_eq!(selection.events, events);
    assert_eq!(selection.model, model);
}

#[test]
fn empty_grid_is_not_viable() {
    let selector = ThresholdSelector::new(ANALYSIS.hmm, ObservationMode::EventReturns);
    let err = selector.select(&closes(100), &[]).unwrap_err();
    assert!(matches!(err, RegimeError::NoViableThreshold { candidates: 0 }));
}

#[test]
fn flat_prices_fail_analysis() {
    let n = 60;
    let series = PriceSeries::from_closes(
        "FLAT",
        (0..n as i64).map(|i| i * 86_400_000).collect(),
        vec![50.0; n],
    )
    .unwrap();
    let err = run_analysis(&series, &AnalysisConfig::default()).unwrap_err();
    assert!(matches!(err, RegimeError::NoViableThreshold { .. }));
}

#[tokio::test]
async fn cache_round_trip_feeds_the_same_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let n = 200;
    let series = PriceSeries::from_closes(
        "CACHED",
        (0..n as i64).map(|i| i * 86_400_000).collect(),
        closes(n),
    )
    .unwrap();

    let path = dir.path().join("prices_CACHED.bin");
    write_price_cache(&path, &series).unwrap();
    assert_eq!(read_price_cache(&path, PERSISTENCE.price.version).unwrap(), series);

    let loaded = PriceCacheFile::new(&path).load().await.unwrap();
    let direct = run_analysis(&series, &ANALYSIS).unwrap();
    let cached = run_analysis(&loaded, &ANALYSIS).unwrap();
    assert_eq!(direct.selection.threshold, cached.selection.threshold);
    assert_eq!(direct.states, cached.states);
}
