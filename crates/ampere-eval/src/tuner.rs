//! Sequential model-based hyperparameter search.
//!
//! [`TpeSampler`] is a tree-structured Parzen estimator: after a number of
//! random startup trials it splits the finished trials into a small "good"
//! group and the rest, fits a Parzen (Gaussian mixture) density to each group
//! per dimension, and proposes the candidate maximizing `l(x) / g(x)`.

use crate::space::{Dimension, ParamSet, SearchSpace};
use ampere_traits::{AmpereError, Result};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{info, warn};

/// Outcome of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialState {
    /// The objective returned a finite value.
    Complete,
    /// The objective failed or returned a non-finite value.
    Failed,
}

/// One evaluated parameter set. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Zero-based trial number.
    pub number: usize,
    /// Parameters passed to the objective, fixed ones included.
    pub params: ParamSet,
    /// Objective value; `NaN` for failed trials.
    pub value: f64,
    /// Outcome.
    pub state: TrialState,
}

impl Trial {
    /// Whether the trial produced a usable value.
    pub fn is_complete(&self) -> bool {
        self.state == TrialState::Complete
    }
}

/// All trials of one minimization run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Study {
    trials: Vec<Trial>,
}

impl Study {
    /// Trials in execution order.
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Completed trial with the lowest value (first one on ties).
    pub fn best(&self) -> Option<&Trial> {
        self.trials
            .iter()
            .filter(|t| t.is_complete())
            .fold(None, |best: Option<&Trial>, t| match best {
                Some(b) if b.value <= t.value => Some(b),
                _ => Some(t),
            })
    }

    fn completed(&self) -> impl Iterator<Item = &Trial> {
        self.trials.iter().filter(|t| t.is_complete())
    }
}

/// Number of trials in the "good" group for `n` completed trials.
pub fn good_group_size(n: usize) -> usize {
    n.div_ceil(10).min(25)
}

/// Tree-structured Parzen estimator.
///
/// Seeded samplers are reproducible: the same seed, space and objective
/// produce the same trials. Unseeded samplers draw from OS entropy and will
/// explore differently on every run.
#[derive(Debug, Clone)]
pub struct TpeSampler {
    rng: StdRng,
    n_startup_trials: usize,
    n_candidates: usize,
}

impl TpeSampler {
    /// Creates a sampler; `None` seeds from the operating system.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            n_startup_trials: 10,
            n_candidates: 24,
        }
    }

    /// Sets the number of random trials before the model takes over.
    pub const fn with_startup_trials(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    /// Proposes the next parameter set.
    pub fn sample(&mut self, space: &SearchSpace, study: &Study) -> ParamSet {
        let mut completed: Vec<&Trial> = study.completed().collect();
        let mut params = space.fixed_params().clone();

        if completed.len() < self.n_startup_trials.max(2) {
            for dim in space.dimensions() {
                let (lo, hi) = dim.distribution.internal_bounds();
                let x = lo + self.rng.random::<f64>() * (hi - lo);
                params.insert(dim.name.clone(), dim.distribution.from_internal(x));
            }
            return params;
        }

        completed.sort_by(|a, b| a.value.total_cmp(&b.value));
        let n_good = good_group_size(completed.len());
        let (good, bad) = completed.split_at(n_good);

        for dim in space.dimensions() {
            let x = self.sample_dimension(dim, good, bad);
            params.insert(dim.name.clone(), dim.distribution.from_internal(x));
        }
        params
    }

    fn sample_dimension(&mut self, dim: &Dimension, good: &[&Trial], bad: &[&Trial]) -> f64 {
        let bounds = dim.distribution.internal_bounds();
        let observed = |trials: &[&Trial]| -> Vec<f64> {
            trials
                .iter()
                .filter_map(|t| t.params.get(&dim.name))
                .map(|v| dim.distribution.to_internal(*v))
                .collect()
        };
        let l = Parzen::fit(&observed(good), bounds);
        let g = Parzen::fit(&observed(bad), bounds);

        let mut best_x = l.draw(&mut self.rng);
        let mut best_score = f64::NEG_INFINITY;
        for _ in 0..self.n_candidates {
            let x = l.draw(&mut self.rng);
            let score = l.log_density(x) - g.log_density(x);
            if score > best_score {
                best_score = score;
                best_x = x;
            }
        }
        best_x
    }
}

/// One-dimensional Gaussian mixture with a broad prior component.
#[derive(Debug, Clone)]
struct Parzen {
    mus: Vec<f64>,
    sigmas: Vec<f64>,
    low: f64,
    high: f64,
}

impl Parzen {
    fn fit(observations: &[f64], (low, high): (f64, f64)) -> Self {
        let width = high - low;
        let mut points: Vec<f64> = observations
            .iter()
            .copied()
            .filter(|x| x.is_finite())
            .collect();
        points.push(0.5 * (low + high));
        points.sort_by(f64::total_cmp);

        let floor = width / (points.len() as f64).min(100.0);
        let sigmas = (0..points.len())
            .map(|i| {
                let left = if i > 0 { points[i] - points[i - 1] } else { points[i] - low };
                let right = if i + 1 < points.len() {
                    points[i + 1] - points[i]
                } else {
                    high - points[i]
                };
                left.max(right).clamp(floor, width)
            })
            .collect();

        Self {
            mus: points,
            sigmas,
            low,
            high,
        }
    }

    fn draw(&self, rng: &mut StdRng) -> f64 {
        let k = rng.random_range(0..self.mus.len());
        for _ in 0..16 {
            let z: f64 = rng.sample(StandardNormal);
            let x = self.mus[k] + self.sigmas[k] * z;
            if (self.low..=self.high).contains(&x) {
                return x;
            }
        }
        self.mus[k].clamp(self.low, self.high)
    }

    fn log_density(&self, x: f64) -> f64 {
        let density: f64 = self
            .mus
            .iter()
            .zip(&self.sigmas)
            .map(|(mu, sigma)| {
                let z = (x - mu) / sigma;
                (-0.5 * z * z).exp() / (sigma * (2.0 * PI).sqrt())
            })
            .sum::<f64>()
            / self.mus.len() as f64;
        density.max(f64::MIN_POSITIVE).ln()
    }
}

/// Drives a sampler over a search space.
#[derive(Debug, Clone)]
pub struct Tuner {
    space: SearchSpace,
    sampler: TpeSampler,
}

impl Tuner {
    /// Creates a tuner over a validated space.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] if the space is invalid.
    pub fn new(space: SearchSpace, seed: Option<u64>) -> Result<Self> {
        space.validate()?;
        Ok(Self {
            space,
            sampler: TpeSampler::new(seed),
        })
    }

    /// Replaces the sampler.
    pub fn with_sampler(mut self, sampler: TpeSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// The search space.
    pub const fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// Runs `n_trials` sequential trials minimizing `objective`.
    ///
    /// An objective error or non-finite value marks the trial as failed; it
    /// is kept in the study but never becomes the best trial.
    ///
    /// # Errors
    ///
    /// Returns [`AmpereError::InvalidConfig`] for zero trials and
    /// [`AmpereError::InsufficientData`] when every trial failed.
    pub fn optimize<F>(&mut self, n_trials: usize, mut objective: F) -> Result<Study>
    where
        F: FnMut(&ParamSet) -> Result<f64>,
    {
        if n_trials == 0 {
            return Err(AmpereError::InvalidConfig(
                "n_trials must be positive".to_string(),
            ));
        }

        let mut study = Study::default();
        for number in 0..n_trials {
            let params = self.sampler.sample(&self.space, &study);
            let (value, state) = match objective(&params) {
                Ok(v) if v.is_finite() => (v, TrialState::Complete),
                Ok(v) => {
                    warn!("trial {number} returned non-finite value {v}");
                    (f64::NAN, TrialState::Failed)
                }
                Err(e) => {
                    warn!("trial {number} failed: {e}");
                    (f64::NAN, TrialState::Failed)
                }
            };
            study.trials.push(Trial {
                number,
                params,
                value,
                state,
            });

            if let Some(best) = study.best() {
                info!(
                    "trial {number} finished with value {value:.4}; best is trial {} with {:.4}",
                    best.number, best.value
                );
            }
        }

        if study.best().is_none() {
            return Err(AmpereError::InsufficientData(
                "every tuning trial failed".to_string(),
            ));
        }
        Ok(study)
    }
}
