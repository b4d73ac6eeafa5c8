//! Gaussian hidden Markov model over a 1-D observation sequence.
//!
//! Training is Baum-Welch (EM) on a scaled forward-backward pass. State means are
//! initialised by a seeded k-means, so the same observations and settings always
//! produce the same model.

use rand::{SeedableRng, rngs::StdRng, seq::index::sample};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Normal};

use crate::{
    config::HmmSettings,
    error::{RegimeError, RegimeResult},
    utils::{argmax, mean_and_stddev},
};

const KMEANS_ITERATIONS: usize = 10;
const TINY: f64 = 1e-300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianHmm {
    pub n_states: usize,
    /// Initial state distribution
    pub start_probs: Vec<f64>,
    /// Row-stochastic transition matrix, `transitions[from][to]`
    pub transitions: Vec<Vec<f64>>,
    /// Per-state emission mean
    pub means: Vec<f64>,
    /// Per-state emission variance
    pub variances: Vec<f64>,
    /// EM iterations actually run
    pub iterations: usize,
    pub converged: bool,
    /// Log-likelihood of the training sequence under the final parameters
    pub train_log_likelihood: f64,
}

/// Output of one E-step.
struct Posteriors {
    gamma: Vec<Vec<f64>>,
    xi_sum: Vec<Vec<f64>>,
    log_likelihood: f64,
}

impl GaussianHmm {
    /// Fit a `settings.n_states`-regime model to `observations`.
    pub fn train(observations: &[f64], settings: &HmmSettings) -> RegimeResult<Self> {
        let k = settings.n_states;
        if k == 0 {
            return Err(RegimeError::invalid("n_states", "must be at least 1"));
        }
        if settings.n_iter == 0 {
            return Err(RegimeError::invalid("n_iter", "must be at least 1"));
        }
        if !settings.min_variance.is_finite() || settings.min_variance < 0.0 {
            return Err(RegimeError::invalid(
                "min_variance",
                format!("{} must be finite and non-negative", settings.min_variance),
            ));
        }
        check_finite(observations)?;
        // One feature per sample, so n_states * n_features == n_states
        if observations.len() < k {
            return Err(RegimeError::insufficient(k, observations.len()));
        }

        let mut model = Self::initialise(observations, settings);

        let mut prev_ll = f64::NEG_INFINITY;
        for iter in 0..settings.n_iter {
            let post = model.forward_backward(observations)?;
            model.maximise(observations, &post, settings.min_variance);
            model.check_parameters()?;
            model.iterations = iter + 1;

            let ll = post.log_likelihood;
            if iter > 0 && (ll - prev_ll).abs() < settings.tol {
                model.converged = true;
                log::debug!("HMM converged after {} iterations (ll={:.4})", iter + 1, ll);
                break;
            }
            prev_ll = ll;
        }

        if !model.converged {
            log::warn!(
                "HMM hit the {} iteration cap without converging (tol={})",
                settings.n_iter,
                settings.tol
            );
        }

        model.train_log_likelihood = model.score(observations)?;
        Ok(model)
    }

    /// Log-likelihood of `observations` under the model. Higher is a better fit.
    pub fn score(&self, observations: &[f64]) -> RegimeResult<f64> {
        if observations.is_empty() {
            return Err(RegimeError::insufficient(1, 0));
        }
        check_finite(observations)?;
        let (_, _, log_likelihood) = self.forward(observations)?;
        Ok(log_likelihood)
    }

    /// Most likely state path (Viterbi), one label per observation.
    pub fn predict(&self, observations: &[f64]) -> RegimeResult<Vec<usize>> {
        check_finite(observations)?;
        let t_len = observations.len();
        if t_len == 0 {
            return Ok(Vec::new());
        }

        let k = self.n_states;
        let log_b = self.emission_log_probs(observations)?;
        let log_pi: Vec<f64> = self.start_probs.iter().map(|p| p.ln()).collect();
        let log_a: Vec<Vec<f64>> = self
            .transitions
            .iter()
            .map(|row| row.iter().map(|p| p.ln()).collect())
            .collect();

        let mut delta: Vec<f64> = (0..k).map(|j| log_pi[j] + log_b[0][j]).collect();
        let mut backptr = vec![vec![0usize; k]; t_len];

        for t in 1..t_len {
            let mut next = vec![f64::NEG_INFINITY; k];
            for j in 0..k {
                let mut best_val = f64::NEG_INFINITY;
                let mut best_state = 0;
                for i in 0..k {
                    let val = delta[i] + log_a[i][j];
                    if val > best_val {
                        best_val = val;
                        best_state = i;
                    }
                }
                next[j] = best_val + log_b[t][j];
                backptr[t][j] = best_state;
            }
            delta = next;
        }

        let mut best_final = 0;
        for j in 1..k {
            if delta[j] > delta[best_final] {
                best_final = j;
            }
        }

        let mut path = vec![0; t_len];
        path[t_len - 1] = best_final;
        for t in (0..t_len - 1).rev() {
            path[t] = backptr[t + 1][path[t + 1]];
        }
        Ok(path)
    }

    /// Posterior state probabilities, `[t][state]`.
    pub fn predict_proba(&self, observations: &[f64]) -> RegimeResult<Vec<Vec<f64>>> {
        check_finite(observations)?;
        if observations.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.forward_backward(observations)?.gamma)
    }

    /// Per-sample posterior argmax (an alternative to the Viterbi path).
    pub fn posterior_states(&self, observations: &[f64]) -> RegimeResult<Vec<usize>> {
        Ok(self
            .predict_proba(observations)?
            .iter()
            .map(|row| argmax(row))
            .collect())
    }

    /// Free parameters: start (k-1) + transitions k(k-1) + means k + variances k
    pub fn n_parameters(&self) -> usize {
        let k = self.n_states;
        (k - 1) + k * (k - 1) + 2 * k
    }

    /// Bayesian information criterion, lower is better.
    pub fn bic(&self, observations: &[f64]) -> RegimeResult<f64> {
        let ll = self.score(observations)?;
        Ok(self.n_parameters() as f64 * (observations.len() as f64).ln() - 2.0 * ll)
    }

    // ─── Internals ──────────────────────────────────────────────────────────

    fn initialise(observations: &[f64], settings: &HmmSettings) -> Self {
        let k = settings.n_states;
        let (_, std) = mean_and_stddev(observations, 0);
        let variance = std * std + settings.min_variance;

        Self {
            n_states: k,
            start_probs: vec![1.0 / k as f64; k],
            transitions: vec![vec![1.0 / k as f64; k]; k],
            means: kmeans_1d(observations, k, settings.seed),
            variances: vec![variance; k],
            iterations: 0,
            converged: false,
            train_log_likelihood: f64::NEG_INFINITY,
        }
    }

    fn emission_log_probs(&self, observations: &[f64]) -> RegimeResult<Vec<Vec<f64>>> {
        let dists = self
            .means
            .iter()
            .zip(&self.variances)
            .enumerate()
            .map(|(j, (&mean, &var))| {
                Normal::new(mean, var.sqrt()).map_err(|e| {
                    RegimeError::TrainingFailure(format!(
                        "state {} has a degenerate emission (mean={}, variance={}): {}",
                        j, mean, var, e
                    ))
                })
            })
            .collect::<RegimeResult<Vec<_>>>()?;

        Ok(observations
            .iter()
            .map(|&x| dists.iter().map(|d| d.ln_pdf(x)).collect())
            .collect())
    }

    /// Scaled forward pass. Returns (alpha, scaled emissions + scales, log-likelihood).
    ///
    /// Emissions are shifted by their per-step maximum before exponentiation, so
    /// `b[t][j] = exp(log_b[t][j] - max_t)` and `ll = Σ ln(c_t) + max_t`.
    #[allow(clippy::type_complexity)]
    fn forward(
        &self,
        observations: &[f64],
    ) -> RegimeResult<(Vec<Vec<f64>>, (Vec<Vec<f64>>, Vec<f64>), f64)> {
        let k = self.n_states;
        let log_b = self.emission_log_probs(observations)?;
        let t_len = observations.len();

        let mut b = Vec::with_capacity(t_len);
        let mut alpha: Vec<Vec<f64>> = Vec::with_capacity(t_len);
        let mut scales = Vec::with_capacity(t_len);
        let mut log_likelihood = 0.0;

        for (t, row) in log_b.iter().enumerate() {
            let shift = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if !shift.is_finite() {
                return Err(RegimeError::TrainingFailure(format!(
                    "emission log-probability is not finite at t={}",
                    t
                )));
            }
            let b_t: Vec<f64> = row.iter().map(|lp| (lp - shift).exp()).collect();

            let mut a_t: Vec<f64> = if t == 0 {
                (0..k).map(|j| self.start_probs[j] * b_t[j]).collect()
            } else {
                let prev = &alpha[t - 1];
                (0..k)
                    .map(|j| {
                        let s: f64 = (0..k).map(|i| prev[i] * self.transitions[i][j]).sum();
                        s * b_t[j]
                    })
                    .collect()
            };

            let c_t: f64 = a_t.iter().sum();
            if !c_t.is_finite() || c_t <= TINY {
                return Err(RegimeError::TrainingFailure(format!(
                    "forward pass underflow at t={} (scale={})",
                    t, c_t
                )));
            }
            a_t.iter_mut().for_each(|a| *a /= c_t);
            log_likelihood += c_t.ln() + shift;

            alpha.push(a_t);
            b.push(b_t);
            scales.push(c_t);
        }

        if !log_likelihood.is_finite() {
            return Err(RegimeError::TrainingFailure(format!(
                "log-likelihood is {}",
                log_likelihood
            )));
        }

        Ok((alpha, (b, scales), log_likelihood))
    }

    fn forward_backward(&self, observations: &[f64]) -> RegimeResult<Posteriors> {
        let k = self.n_states;
        let t_len = observations.len();
        let (alpha, (b, scales), log_likelihood) = self.forward(observations)?;

        let mut beta = vec![vec![1.0; k]; t_len];
        for t in (0..t_len.saturating_sub(1)).rev() {
            for i in 0..k {
                let s: f64 = (0..k)
                    .map(|j| self.transitions[i][j] * b[t + 1][j] * beta[t + 1][j])
                    .sum();
                beta[t][i] = s / scales[t + 1];
            }
        }

        let gamma: Vec<Vec<f64>> = (0..t_len)
            .map(|t| {
                let mut row: Vec<f64> = (0..k).map(|j| alpha[t][j] * beta[t][j]).collect();
                let sum: f64 = row.iter().sum();
                if sum > TINY {
                    row.iter_mut().for_each(|g| *g /= sum);
                }
                row
            })
            .collect();

        let mut xi_sum = vec![vec![0.0; k]; k];
        for t in 0..t_len.saturating_sub(1) {
            for i in 0..k {
                for j in 0..k {
                    xi_sum[i][j] += alpha[t][i] * self.transitions[i][j] * b[t + 1][j]
                        * beta[t + 1][j]
                        / scales[t + 1];
                }
            }
        }

        Ok(Posteriors {
            gamma,
            xi_sum,
            log_likelihood,
        })
    }

    fn maximise(&mut self, observations: &[f64], post: &Posteriors, min_variance: f64) {
        let k = self.n_states;

        self.start_probs = post.gamma[0].clone();

        for i in 0..k {
            let row_sum: f64 = post.xi_sum[i].iter().sum();
            // A state never left keeps its previous row
            if row_sum > TINY {
                for j in 0..k {
                    self.transitions[i][j] = post.xi_sum[i][j] / row_sum;
                }
            }
        }

        for j in 0..k {
            let weight: f64 = post.gamma.iter().map(|g| g[j]).sum();
            if weight <= TINY {
                continue;
            }
            let mean = post
                .gamma
                .iter()
                .zip(observations)
                .map(|(g, x)| g[j] * x)
                .sum::<f64>()
                / weight;
            let var = post
                .gamma
                .iter()
                .zip(observations)
                .map(|(g, x)| g[j] * (x - mean) * (x - mean))
                .sum::<f64>()
                / weight;
            self.means[j] = mean;
            self.variances[j] = var + min_variance;
        }
    }

    fn check_parameters(&self) -> RegimeResult<()> {
        let all_finite = self.start_probs.iter().all(|p| p.is_finite())
            && self.transitions.iter().flatten().all(|p| p.is_finite())
            && self.means.iter().all(|m| m.is_finite())
            && self.variances.iter().all(|v| v.is_finite());
        if !all_finite {
            return Err(RegimeError::TrainingFailure(
                "EM produced non-finite parameters".to_string(),
            ));
        }
        if let Some(j) = self.variances.iter().position(|&v| v <= 0.0) {
            return Err(RegimeError::TrainingFailure(format!(
                "state {} variance collapsed to zero",
                j
            )));
        }
        Ok(())
    }
}

fn check_finite(observations: &[f64]) -> RegimeResult<()> {
    match observations.iter().position(|x| !x.is_finite()) {
        Some(i) => Err(RegimeError::invalid(
            "observations",
            format!("value {} at index {} is not finite", observations[i], i),
        )),
        None => Ok(()),
    }
}

/// Seeded Lloyd's k-means on scalars. Centres come back sorted ascending,
/// so state 0 starts as the lowest-mean regime.
fn kmeans_1d(data: &[f64], k: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centres: Vec<f64> = sample(&mut rng, data.len(), k)
        .into_iter()
        .map(|i| data[i])
        .collect();

    for _ in 0..KMEANS_ITERATIONS {
        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for &x in data {
            let nearest = (0..k)
                .min_by(|&a, &b| (x - centres[a]).abs().total_cmp(&(x - centres[b]).abs()))
                .unwrap_or(0);
            sums[nearest] += x;
            counts[nearest] += 1;
        }
        for j in 0..k {
            if counts[j] > 0 {
                centres[j] = sums[j] / counts[j] as f64;
            }
        }
    }

    centres.sort_by(|a, b| a.total_cmp(b));
    centres
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use fixtures::two_regime_sequence;

    fn settings(n_states: usize) -> HmmSettings {
        HmmSettings {
            n_states,
            ..HmmSettings::default()
        }
    }

    /// Deterministic two-regime sample (Box-Muller over a seeded StdRng).
    mod fixtures {
        use rand::{Rng, SeedableRng, rngs::StdRng};

        fn box_muller(rng: &mut StdRng) -> f64 {
            let u1: f64 = rng.r#gen::<f64>().max(1e-12);
            let u2: f64 = rng.r#gen::<f64>();
            (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
        }

        /// 50-sample blocks alternating between N(-0.02, 0.005²) and N(+0.02, 0.005²).
        pub fn two_regime_sequence(blocks: usize) -> (Vec<f64>, Vec<usize>) {
            let mut rng = StdRng::seed_from_u64(7);
            let mut obs = Vec::new();
            let mut truth = Vec::new();
            for b in 0..blocks {
                let state = b % 2;
                let mean = if state == 0 { -0.02 } else { 0.02 };
                for _ in 0..50 {
                    obs.push(mean + 0.005 * box_muller(&mut rng));
                    truth.push(state);
                }
            }
            (obs, truth)
        }
    }

    #[test]
    fn recovers_two_separated_regimes() {
        let (obs, truth) = two_regime_sequence(6);
        let model = GaussianHmm::train(&obs, &settings(2)).unwrap();

        let mut means = model.means.clone();
        means.sort_by(|a, b| a.total_cmp(b));
        assert_abs_diff_eq!(means[0], -0.02, epsilon = 0.003);
        assert_abs_diff_eq!(means[1], 0.02, epsilon = 0.003);

        // Map the state with the lower mean onto truth label 0
        let low = if model.means[0] < model.means[1] { 0 } else { 1 };
        let states = model.predict(&obs).unwrap();
        let agree = states
            .iter()
            .zip(&truth)
            .filter(|(s, t)| (**s == low) == (**t == 0))
            .count();
        assert!(agree as f64 / obs.len() as f64 > 0.95, "agreement {}", agree);

        for row in &model.transitions {
            assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(model.start_probs.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn training_is_reproducible() {
        let (obs, _) = two_regime_sequence(4);
        let a = GaussianHmm::train(&obs, &settings(2)).unwrap();
        let b = GaussianHmm::train(&obs, &settings(2)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn score_matches_training_likelihood() {
        let (obs, _) = two_regime_sequence(4);
        let model = GaussianHmm::train(&obs, &settings(2)).unwrap();
        assert_eq!(model.score(&obs).unwrap(), model.train_log_likelihood);
        assert!(model.train_log_likelihood.is_finite());
    }

    #[test]
    fn single_state_matches_gaussian_fit() {
        let obs = [0.01, -0.02, 0.03, 0.0, -0.01];
        let model = GaussianHmm::train(&obs, &settings(1)).unwrap();
        let (mean, std) = mean_and_stddev(&obs, 0);
        assert_abs_diff_eq!(model.means[0], mean, epsilon = 1e-12);
        assert_abs_diff_eq!(model.variances[0], std * std + 1e-8, epsilon = 1e-12);
        assert_eq!(model.predict(&obs).unwrap(), vec![0; 5]);
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            GaussianHmm::train(&[0.1, 0.2], &settings(0)),
            Err(RegimeError::InvalidParameter { name: "n_states", .. })
        ));
        assert_eq!(
            GaussianHmm::train(&[0.1], &settings(2)),
            Err(RegimeError::InsufficientData {
                required: 2,
                available: 1
            })
        );
        assert!(matches!(
            GaussianHmm::train(&[0.1, f64::NAN, 0.3], &settings(2)),
            Err(RegimeError::InvalidParameter { name: "observations", .. })
        ));
    }

    #[test]
    fn constant_observations_without_variance_floor_fail_cleanly() {
        let hmm = HmmSettings {
            min_variance: 0.0,
            ..settings(2)
        };
        let err = GaussianHmm::train(&[0.0, 0.0, 0.0, 0.0], &hmm).unwrap_err();
        assert!(matches!(err, RegimeError::TrainingFailure(_)));
    }

    #[test]
    fn posterior_rows_sum_to_one() {
        let (obs, _) = two_regime_sequence(2);
        let model = GaussianHmm::train(&obs, &settings(2)).unwrap();
        let proba = model.predict_proba(&obs).unwrap();
        assert_eq!(proba.len(), obs.len());
        for row in &proba {
            assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        }
        assert_eq!(model.posterior_states(&obs).unwrap().len(), obs.len());
    }

    #[test]
    fn empty_sequences() {
        let model = GaussianHmm::train(&[0.1, -0.1, 0.05], &settings(2)).unwrap();
        assert_eq!(model.predict(&[]).unwrap(), Vec::<usize>::new());
        assert!(matches!(
            model.score(&[]),
            Err(RegimeError::InsufficientData { .. })
        ));
    }

    #[test]
    fn kmeans_centres_sorted() {
        let centres = kmeans_1d(&[5.0, 5.1, -3.0, -3.1, 5.2, -2.9], 2, 42);
        assert!(centres[0] < 0.0 && centres[1] > 0.0);
    }
}
