//! Grid search over DC thresholds, scored by regime-model fit.
//!
//! Each candidate is run end to end (detect, build observations, train, score).
//! A candidate that cannot produce a usable model scores `-inf` and the search
//! moves on; only an empty or all-failed grid is an error.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    analysis::{
        directional_change::{DirectionalChangeDetector, change_count},
        features::build_observations,
    },
    config::{HmmSettings, ObservationMode, Threshold},
    error::{RegimeError, RegimeResult},
    models::{ChangeEvent, GaussianHmm},
    trace_time,
};

/// Fewest observations a candidate needs before it is trained at all.
const MIN_OBSERVATIONS: usize = 2;

/// Outcome of one grid point, kept for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub threshold: f64,
    /// Log-likelihood, or `-inf` when the candidate failed
    pub score: f64,
    /// Non-seed change events found at this threshold
    pub n_events: usize,
    pub failure: Option<String>,
}

impl CandidateScore {
    pub fn is_viable(&self) -> bool {
        self.score > f64::NEG_INFINITY
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub threshold: Threshold,
    pub model: GaussianHmm,
    pub events: Vec<ChangeEvent>,
    /// Observations the winning model was trained on
    pub observations: Vec<f64>,
    pub score: f64,
    /// Every candidate in grid order
    pub candidates: Vec<CandidateScore>,
}

/// Everything one successful candidate produced.
struct Fitted {
    threshold: Threshold,
    model: GaussianHmm,
    events: Vec<ChangeEvent>,
    observations: Vec<f64>,
    score: f64,
}

#[derive(Debug, Clone)]
pub struct ThresholdSelector {
    pub hmm: HmmSettings,
    pub mode: ObservationMode,
}

impl Default for ThresholdSelector {
    fn default() -> Self {
        Self {
            hmm: HmmSettings::default(),
            mode: ObservationMode::default(),
        }
    }
}

impl ThresholdSelector {
    pub fn new(hmm: HmmSettings, mode: ObservationMode) -> Self {
        Self { hmm, mode }
    }

    /// Evaluate `candidates` in order, returning the best-scoring one.
    pub fn select(&self, prices: &[f64], candidates: &[f64]) -> RegimeResult<Selection> {
        let results: Vec<_> = candidates
            .iter()
            .map(|&t| self.evaluate(prices, t))
            .collect();
        self.aggregate(candidates, results)
    }

    /// Same result as [`Self::select`], candidates evaluated on the rayon pool.
    pub fn select_parallel(&self, prices: &[f64], candidates: &[f64]) -> RegimeResult<Selection> {
        // Indexed parallel collect preserves grid order for the tie-break
        let results: Vec<_> = candidates
            .par_iter()
            .map(|&t| self.evaluate(prices, t))
            .collect();
        self.aggregate(candidates, results)
    }

    fn evaluate(&self, prices: &[f64], threshold: f64) -> (CandidateScore, Option<Fitted>) {
        trace_time!("Evaluate threshold candidate", 20_000, {
            match self.fit(prices, threshold) {
                Ok(fitted) => {
                    let summary = CandidateScore {
                        threshold,
                        score: fitted.score,
                        n_events: change_count(&fitted.events),
                        failure: None,
                    };
                    (summary, Some(fitted))
                }
                Err((n_events, e)) => {
                    log::debug!("threshold {} rejected: {}", threshold, e);
                    let summary = CandidateScore {
                        threshold,
                        score: f64::NEG_INFINITY,
                        n_events,
                        failure: Some(e.to_string()),
                    };
                    (summary, None)
                }
            }
        })
    }

    /// Error side carries the event count reached before failing.
    fn fit(&self, prices: &[f64], threshold: f64) -> Result<Fitted, (usize, RegimeError)> {
        let threshold = Threshold::new(threshold).map_err(|e| (0, e))?;
        let events = DirectionalChangeDetector::new(threshold).detect(prices);
        let n_events = change_count(&events);

        let fitted = build_observations(prices, &events, self.mode)
            .and_then(|obs| {
                if obs.len() < MIN_OBSERVATIONS {
                    return Err(RegimeError::insufficient(MIN_OBSERVATIONS, obs.len()));
                }
                let model = GaussianHmm::train(&obs, &self.hmm)?;
                let score = model.score(&obs)?;
                if !score.is_finite() {
                    return Err(RegimeError::TrainingFailure(format!(
                        "non-finite score {}",
                        score
                    )));
                }
                Ok((obs, model, score))
            })
            .map_err(|e| (n_events, e))?;

        let (observations, model, score) = fitted;
        Ok(Fitted {
            threshold,
            model,
            events,
            observations,
            score,
        })
    }

    fn aggregate(
        &self,
        candidates: &[f64],
        results: Vec<(CandidateScore, Option<Fitted>)>,
    ) -> RegimeResult<Selection> {
        let mut scores = Vec::with_capacity(results.len());
        let mut best: Option<Fitted> = None;

        for (summary, fitted) in results {
            if let Some(fitted) = fitted {
                // Strict: the first of equal scores keeps the lead
                if best.as_ref().is_none_or(|b| fitted.score > b.score) {
                    best = Some(fitted);
                }
            }
            scores.push(summary);
        }

        let Some(best) = best else {
            log::warn!(
                "No viable threshold among {} candidate(s)",
                candidates.len()
            );
            return Err(RegimeError::NoViableThreshold {
                candidates: candidates.len(),
            });
        };

        log::info!(
            "Selected threshold {} (score {:.4}, {} events, {}/{} candidates viable)",
            best.threshold,
            best.score,
            change_count(&best.events),
            scores.iter().filter(|c| c.is_viable()).count(),
            scores.len()
        );

        Ok(Selection {
            threshold: best.threshold,
            model: best.model,
            events: best.events,
            observations: best.observations,
            score: best.score,
            candidates: scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::linspace;

    /// Jittered zig-zag with swings of alternating size so several thresholds are viable.
    fn zigzag(n: usize) -> Vec<f64> {
        let mut prices = Vec::with_capacity(n);
        let mut p = 100.0;
        for i in 0..n {
            let swing = if (i / 5) % 3 == 0 { 0.03 } else { 0.012 };
            let jitter = 0.004 * (i as f64 * 1.7).sin();
            let up = (i / 5) % 2 == 0;
            p *= if up { 1.0 + swing + jitter } else { 1.0 - swing + jitter };
            prices.push(p);
        }
        prices
    }

    #[test]
    fn empty_grid_is_error() {
        let sel = ThresholdSelector::default();
        assert_eq!(
            sel.select(&zigzag(50), &[]).unwrap_err(),
            RegimeError::NoViableThreshold { candidates: 0 }
        );
    }

    #[test]
    fn all_failed_is_error() {
        let sel = ThresholdSelector::default();
        // Too short for any threshold to yield 2 observations
        let err = sel.select(&[100.0], &[0.01, 0.02]).unwrap_err();
        assert_eq!(err, RegimeError::NoViableThreshold { candidates: 2 });
    }

    #[test]
    fn invalid_candidates_score_neg_inf() {
        let sel = ThresholdSelector::default();
        let prices = zigzag(200);
        let out = sel.select(&prices, &[-0.5, 0.01, 1.5]).unwrap();
        assert_eq!(out.threshold.value(), 0.01);
        assert_eq!(out.candidates.len(), 3);
        assert_eq!(out.candidates[0].score, f64::NEG_INFINITY);
        assert!(out.candidates[0].failure.is_some());
        assert!(out.candidates[1].is_viable());
        assert_eq!(out.candidates[2].score, f64::NEG_INFINITY);
    }

    #[test]
    fn selection_is_the_max_viable_score() {
        let sel = ThresholdSelector::default();
        let prices = zigzag(300);
        let grid = linspace(0.005, 0.05, 10);
        let out = sel.select(&prices, &grid).unwrap();

        let max = out
            .candidates
            .iter()
            .map(|c| c.score)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(out.score, max);
        let first_max = out.candidates.iter().find(|c| c.score == max).unwrap();
        assert_eq!(first_max.threshold, out.threshold.value());
    }

    #[test]
    fn duplicate_candidates_keep_first() {
        let sel = ThresholdSelector::default();
        let prices = zigzag(200);
        let out = sel.select(&prices, &[0.02, 0.02]).unwrap();
        assert_eq!(out.candidates[0].score, out.candidates[1].score);
        assert_eq!(out.threshold.value(), 0.02);
    }

    #[test]
    fn parallel_matches_sequential() {
        let sel = ThresholdSelector::default();
        let prices = zigzag(300);
        let grid = linspace(0.005, 0.05, 10);
        let a = sel.select(&prices, &grid).unwrap();
        let b = sel.select_parallel(&prices, &grid).unwrap();
        assert_eq!(a.threshold, b.threshold);
        assert_eq!(a.score, b.score);
        assert_eq!(a.model, b.model);
        assert_eq!(a.candidates, b.candidates);
    }

    #[test]
    fn single_observation_is_rejected_even_for_one_state() {
        let sel = ThresholdSelector::new(
            HmmSettings {
                n_states: 1,
                ..HmmSettings::default()
            },
            ObservationMode::EventReturns,
        );
        // One 25% drop, then chop far below the 20% rebound
        let mut prices = vec![100.0, 75.0];
        prices.extend((0..40).map(|i| if i % 2 == 0 { 77.0 } else { 75.5 }));

        let err = sel.select(&prices, &[0.2]).unwrap_err();
        assert_eq!(err, RegimeError::NoViableThreshold { candidates: 1 });

        let out = sel.select(&prices, &[0.01, 0.2]).unwrap();
        assert_eq!(out.threshold.value(), 0.01);
        assert_eq!(out.candidates[1].score, f64::NEG_INFINITY);
        assert_eq!(out.candidates[1].n_events, 1);
        assert!(out.candidates[1].failure.is_some());
    }

    #[test]
    fn price_mode_trains_on_daily_returns() {
        let sel = ThresholdSelector::new(HmmSettings::default(), ObservationMode::PriceReturns);
        let prices = zigzag(120);
        let out = sel.select(&prices, &[0.02]).unwrap();
        assert_eq!(out.observations.len(), prices.len() - 1);
    }
}
