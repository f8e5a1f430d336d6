/*!
# Adaptive proposal engine

This module implements the proposal side of the adaptive Metropolis-Hastings
sampler. The workhorse is [`AdaptiveProposal`]: a multivariate-Gaussian
proposal whose covariance is re-estimated continuously from the history of
the chain itself, and whose overall scale is steered toward a target
acceptance rate. [`FixedStepProposal`] is a non-adaptive isotropic baseline.

Both implement the [`Propose`] trait consumed by
[`AdaptiveMetropolis`](crate::metropolis::AdaptiveMetropolis). The contract
is deliberately symmetric: the engine only ever sees the current point and
its log-posterior value, so the same engine can be driven by any loop that
owns a chain. When the driver knows whether its previous accept/reject
decision succeeded it says so; otherwise the engine infers movement by
comparing against cached state.

On each call the adaptive engine:

1. folds the current point into its running mean and covariance,
2. nudges the scalar step width `sigma` toward the target acceptance rate,
3. periodically re-derives the Cholesky factor of the covariance (with
   numeric safeguards if the decomposition fails), and
4. emits a proposal drawn from `N(current, sigma^2 * cov)`.

Individual dimensions can be overridden to an independent uniform draw over
`[low, high)`; such dimensions neither feed nor receive covariance coupling.

# Examples

```rust
use adaptive_mcmc::proposal::{AdaptiveProposal, Propose};

let mut engine = AdaptiveProposal::new().set_seed(42);
let current = [0.5, -0.25];
let mut proposal = [0.0; 2];
engine.propose(&mut proposal, &current, -0.15, None).unwrap();
assert_eq!(engine.dim(), 2);
```
*/

use log::{debug, warn};
use nalgebra::{Cholesky, DMatrix, DVector};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::core::{Result, SamplerError};

/// Default target acceptance rate; the magic value in the literature for
/// random-walk Metropolis is 44%.
pub const DEFAULT_TARGET_ACCEPTANCE: f64 = 0.44;

/// Covariance window installed when the user leaves it unset (or sets it
/// below 1000): effectively "average over all history".
const DEFAULT_COVARIANCE_WINDOW: f64 = 10_000_000.0;

/// Anything that can turn the chain's current state into the next trial
/// point.
pub trait Propose {
    /// Fill `proposal` with a new trial point.
    ///
    /// `current` is the last accepted point and `value` the log-posterior
    /// there. `accepted` is the outcome of the driver's previous
    /// accept/reject decision when the driver knows it; `None` means "work
    /// it out yourself".
    fn propose(
        &mut self,
        proposal: &mut [f64],
        current: &[f64],
        value: f64,
        accepted: Option<bool>,
    ) -> Result<()>;

    /// Returns this engine re-seeded with `seed`, for reproducible chains.
    fn set_seed(self, seed: u64) -> Self
    where
        Self: Sized;
}

/// How proposals are drawn for one dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProposalKind {
    /// Correlated Gaussian draw through the learned covariance; `sigma` is
    /// an optional prior width hint used to seed the diagonal and to floor
    /// the variance during safeguard passes.
    Gaussian { sigma: Option<f64> },
    /// Independent uniform draw over `[low, high)`, excluded from the
    /// covariance coupling in both directions.
    Uniform { low: f64, high: f64 },
}

impl Default for ProposalKind {
    fn default() -> Self {
        ProposalKind::Gaussian { sigma: None }
    }
}

impl ProposalKind {
    fn is_uniform(&self) -> bool {
        matches!(self, ProposalKind::Uniform { .. })
    }

    /// Variance the posterior is expected to have in this dimension, used
    /// as the reference scale for the variance floor.
    fn expected_variance(&self) -> f64 {
        match *self {
            ProposalKind::Gaussian { sigma: Some(s) } => s * s,
            ProposalKind::Gaussian { sigma: None } => 1.0,
            ProposalKind::Uniform { low, high } => (high - low) * (high - low) / 12.0,
        }
    }
}

/// Adaptive multivariate-Gaussian proposal.
///
/// Keeps a running estimate of the chain's mean and covariance, a Cholesky
/// factor of the covariance that is refreshed at widening intervals, and a
/// scalar width `sigma` steered so that the observed acceptance rate tracks
/// the target. All estimates use bounded effective-sample-size weights, so
/// they behave like exponential moving averages once their window fills.
///
/// The engine sizes its buffers on first use (or at [`set_dim`]) and
/// allocates nothing afterwards.
///
/// [`set_dim`]: AdaptiveProposal::set_dim
pub struct AdaptiveProposal {
    kinds: Vec<ProposalKind>,
    last_point: Vec<f64>,
    last_value: f64,
    mean: DVector<f64>,
    cov: DMatrix<f64>,
    /// Upper-triangular factor `U` with `U^T U = cov` as of the last
    /// successful refresh; the covariance drifts between refreshes.
    chol: DMatrix<f64>,
    sigma: f64,
    acceptance: f64,
    target_acceptance: f64,
    trials: u64,
    successes: u64,
    mean_weight: f64,
    cov_weight: f64,
    accept_weight: f64,
    accept_window: f64,
    cov_window: f64,
    next_update: i64,
    initialized: bool,
    rng: SmallRng,
}

impl Default for AdaptiveProposal {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveProposal {
    pub fn new() -> Self {
        Self {
            kinds: Vec::new(),
            last_point: Vec::new(),
            last_value: 0.0,
            mean: DVector::zeros(0),
            cov: DMatrix::zeros(0, 0),
            chol: DMatrix::zeros(0, 0),
            // Re-seeded to sqrt(1/D) at the first reset.
            sigma: 0.0,
            // The first step of a chain is always accepted.
            acceptance: 1.0,
            target_acceptance: DEFAULT_TARGET_ACCEPTANCE,
            trials: 0,
            successes: 0,
            mean_weight: 0.0,
            cov_weight: 0.0,
            accept_weight: 0.0,
            accept_window: 0.0,
            // Negative means "unset"; the first reset installs the default.
            cov_window: -1.0,
            next_update: 0,
            initialized: false,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Fix the dimensionality before first use. Normally unnecessary: the
    /// engine picks the dimension up from the first point it sees. Calling
    /// this twice is reported and ignored.
    pub fn set_dim(&mut self, dim: usize) {
        if !self.kinds.is_empty() {
            warn!(
                "proposal dimensionality already fixed at {}; ignoring set_dim({})",
                self.kinds.len(),
                dim
            );
            return;
        }
        self.kinds = vec![ProposalKind::default(); dim];
        self.last_point = vec![0.0; dim];
    }

    /// Hint the prior width of dimension `dim`. Only needed when a
    /// dimension is much wider or narrower than unit scale.
    pub fn set_gaussian(&mut self, dim: usize, sigma: f64) {
        if dim >= self.kinds.len() {
            warn!("dimension {} is out of range; ignoring set_gaussian", dim);
            return;
        }
        if sigma <= 0.0 {
            warn!(
                "width hint for dimension {} must be positive, got {}; ignoring",
                dim, sigma
            );
            return;
        }
        self.kinds[dim] = ProposalKind::Gaussian { sigma: Some(sigma) };
    }

    /// Override dimension `dim` to an independent uniform draw over
    /// `[low, high)`.
    pub fn set_uniform(&mut self, dim: usize, low: f64, high: f64) {
        if dim >= self.kinds.len() {
            warn!("dimension {} is out of range; ignoring set_uniform", dim);
            return;
        }
        if low >= high {
            warn!(
                "uniform bounds for dimension {} must satisfy low < high, got [{}, {}); ignoring",
                dim, low, high
            );
            return;
        }
        debug!(
            "overriding dimension {} to a uniform draw over [{}, {})",
            dim, low, high
        );
        self.kinds[dim] = ProposalKind::Uniform { low, high };
    }

    /// Override the effective memory length of the mean/covariance
    /// estimates. The default averages over essentially all history; a
    /// shorter window can help with pathological posteriors.
    pub fn set_covariance_window(&mut self, window: usize) {
        self.cov_window = window as f64;
    }

    /// Override the acceptance rate that the step-width adaptation aims
    /// for.
    pub fn set_target_acceptance(&mut self, target: f64) {
        self.target_acceptance = target;
    }

    pub fn dim(&self) -> usize {
        self.kinds.len()
    }

    /// Current scalar width multiplying proposal draws.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Exponentially smoothed acceptance rate.
    pub fn acceptance(&self) -> f64 {
        self.acceptance
    }

    pub fn trials(&self) -> u64 {
        self.trials
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    /// Running estimate of the chain's mean.
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Running estimate of the chain's covariance.
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.cov
    }

    /// Upper-triangular Cholesky factor in use for draws (the covariance
    /// as of the last refresh).
    pub fn cholesky(&self) -> &DMatrix<f64> {
        &self.chol
    }

    /// Re-derive the Cholesky factor from the current covariance estimate
    /// and partially forget old history so newly learned structure
    /// dominates the next stretch of the chain.
    ///
    /// Called automatically at widening intervals; exposed because it can
    /// also be forced, e.g. right after reconfiguration.
    pub fn update_proposal(&mut self) {
        debug!(
            "proposal update after {}/{} accepted (rate {:.3}, width {:.4})",
            self.successes, self.trials, self.acceptance, self.sigma
        );

        self.cov_weight = (0.1 * self.cov_weight).max(1000.0).min(0.1 * self.cov_window);
        self.accept_weight = (0.1 * self.accept_weight)
            .max(1000.0)
            .min(0.1 * self.accept_window);

        if self.refresh_cholesky() {
            return;
        }

        warn!("covariance decomposition failed; applying numeric safeguards");
        self.apply_safeguards();
        if self.refresh_cholesky() {
            return;
        }

        // Still not positive definite: discard everything the chain has
        // taught us and start over from the diagonal guess. This probably
        // won't happen twice.
        warn!("covariance still not decomposable after safeguards; resetting the proposal");
        self.reset_proposal();
    }

    /// Forget the learned covariance and acceptance history, keeping the
    /// most recent point as the new center. Useful at the end of burn-in
    /// to erase the path to equilibrium.
    pub fn reset_proposal(&mut self) {
        let dim = self.kinds.len();
        if dim == 0 {
            warn!("reset_proposal called before first use; ignoring");
            return;
        }
        debug!(
            "proposal reset after {} successes in {} trials (rate {:.3}, width {:.4})",
            self.successes, self.trials, self.acceptance, self.sigma
        );

        self.trials = 0;
        self.successes = 0;

        // A fresh engine carries sigma == 0, so this re-seed always runs on
        // the first reset.
        let default_sigma = (1.0 / dim as f64).sqrt();
        if self.sigma < 0.01 * default_sigma {
            self.sigma = default_sigma;
        }

        self.cov = DMatrix::zeros(dim, dim);
        for (i, kind) in self.kinds.iter().enumerate() {
            self.cov[(i, i)] = match *kind {
                ProposalKind::Gaussian { sigma: Some(s) } => s * s,
                _ => 1.0,
            };
        }
        self.chol = DMatrix::zeros(dim, dim);

        if self.cov_window < 1000.0 {
            self.cov_window = DEFAULT_COVARIANCE_WINDOW;
        }

        // The seed point enters the running averages with a small prior
        // weight.
        self.mean = DVector::from_column_slice(&self.last_point);
        self.mean_weight = 10.0_f64.min(0.1 * self.cov_window);
        self.acceptance = self.target_acceptance;
        self.accept_weight = 10.0_f64.min(0.5 * self.accept_window);

        self.update_proposal();
    }

    /// First-use setup: fix the dimension, cache the seed point, size the
    /// windows and build the initial diagonal proposal.
    fn initialize(&mut self, current: &[f64], value: f64) -> Result<()> {
        if self.kinds.is_empty() {
            self.set_dim(current.len());
        } else if self.kinds.len() != current.len() {
            return Err(SamplerError::DimensionMismatch {
                expected: self.kinds.len(),
                got: current.len(),
            });
        }
        self.initialized = true;
        self.last_point.copy_from_slice(current);
        self.last_value = value;

        let d = current.len() as f64;
        self.accept_window = d * d + 1000.0;
        self.next_update = self.accept_window as i64;
        self.reset_proposal();
        Ok(())
    }

    /// Fold `(current, value)` into all running estimates and refresh the
    /// Cholesky factor when the countdown expires.
    fn update_state(&mut self, current: &[f64], value: f64, accepted: Option<bool>) -> Result<()> {
        if !self.initialized {
            self.initialize(current, value)?;
        } else if current.len() != self.kinds.len() {
            return Err(SamplerError::DimensionMismatch {
                expected: self.kinds.len(),
                got: current.len(),
            });
        }
        self.trials += 1;

        // Outcome of the previous accept/reject decision. Without an
        // explicit answer from the driver, the chain moved if the value or
        // a coordinate changed; that check is right more than 99.9% of the
        // time.
        let accepted = accepted.unwrap_or_else(|| {
            let k = if current.len() > 1 { 1 } else { 0 };
            value != self.last_value || current[k] != self.last_point[k]
        });
        if accepted {
            self.successes += 1;
        }

        // Smooth the acceptance rate over roughly the last accept_window
        // trials.
        let hit = if accepted { 1.0 } else { 0.0 };
        self.acceptance = (self.acceptance * self.accept_weight + hit) / (self.accept_weight + 1.0);
        self.accept_weight = (self.accept_weight + 1.0).min(self.accept_window);

        // Steer the step width toward the target acceptance. The exponent
        // is tiny, so sigma drifts rather than oscillates; the ratio is 1
        // at equilibrium.
        let exponent = (0.5 / self.accept_window).min(0.001);
        self.sigma *= (self.acceptance / self.target_acceptance).powf(exponent);

        // Running mean.
        for (m, &x) in self.mean.iter_mut().zip(current.iter()) {
            *m = (*m * self.mean_weight + x) / (self.mean_weight + 1.0);
        }
        self.mean_weight = (self.mean_weight + 1.0).min(self.cov_window);

        // Running covariance, both triangles kept in sync. The residual
        // uses the freshly updated mean; with mean_weight large the
        // difference from the two-pass estimate is negligible.
        for i in 0..current.len() {
            for j in 0..=i {
                let r = (current[i] - self.mean[i]) * (current[j] - self.mean[j]);
                let v = (self.cov[(i, j)] * self.cov_weight + r) / (self.cov_weight + 1.0);
                self.cov[(i, j)] = v;
                self.cov[(j, i)] = v;
            }
        }
        self.cov_weight = (self.cov_weight + 1.0).min(self.cov_window);

        // Refresh the factor on a countdown of accepted steps; the
        // interval widens as the chain matures.
        if accepted {
            self.next_update -= 1;
            if self.next_update < 1 {
                self.next_update = self.accept_window as i64 + (self.successes / 2) as i64;
                self.update_proposal();
            }
        }

        self.last_point.copy_from_slice(current);
        self.last_value = value;
        Ok(())
    }

    /// Attempt the decomposition; on success install the upper factor.
    fn refresh_cholesky(&mut self) -> bool {
        match Cholesky::new(self.cov.clone()) {
            Some(chol) => {
                self.chol = chol.l().transpose();
                true
            }
            None => false,
        }
    }

    /// Fix up the covariance after a failed decomposition: floor tiny (or
    /// negative) diagonal entries and cap runaway positive correlations.
    /// Strong anti-correlations are left alone and fall through to a reset
    /// if they keep the matrix indefinite.
    fn apply_safeguards(&mut self) {
        let dim = self.kinds.len();
        let eps_floor = f64::EPSILON.sqrt();
        for i in 0..dim {
            let floor = eps_floor * self.kinds[i].expected_variance();
            if self.cov[(i, i)] < floor {
                warn!(
                    "flooring variance of dimension {} at {:e} (was {:e})",
                    i,
                    floor,
                    self.cov[(i, i)]
                );
                self.cov[(i, i)] = floor;
            }
        }
        for i in 0..dim {
            for j in (i + 1)..dim {
                let scale = (self.cov[(i, i)] * self.cov[(j, j)]).sqrt();
                let rho = self.cov[(i, j)] / scale;
                if rho > 0.95 {
                    let capped = 0.95 * 0.95 * scale;
                    self.cov[(i, j)] = capped;
                    self.cov[(j, i)] = capped;
                }
            }
        }
    }
}

impl Propose for AdaptiveProposal {
    fn propose(
        &mut self,
        proposal: &mut [f64],
        current: &[f64],
        value: f64,
        accepted: Option<bool>,
    ) -> Result<()> {
        if proposal.len() != current.len() {
            return Err(SamplerError::DimensionMismatch {
                expected: current.len(),
                got: proposal.len(),
            });
        }

        self.update_state(current, value, accepted)?;

        proposal.copy_from_slice(current);
        for i in 0..current.len() {
            if let ProposalKind::Uniform { low, high } = self.kinds[i] {
                proposal[i] = self.rng.gen_range(low..high);
                continue;
            }
            // One unit normal per Gaussian dimension, spread over the
            // Gaussian block through row i of the Cholesky factor. The D
            // independent normals together produce a draw with covariance
            // sigma^2 * cov.
            let r: f64 = self.rng.sample(StandardNormal);
            for j in 0..current.len() {
                if self.kinds[j].is_uniform() {
                    continue;
                }
                proposal[j] += self.sigma * r * self.chol[(i, j)];
            }
        }
        Ok(())
    }

    fn set_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }
}

/// A fixed-width isotropic Gaussian step: every dimension moves by
/// independent `N(0, sigma^2)` noise.
///
/// Useful as a baseline, or when the posterior geometry is already well
/// understood. A negative width means "pick `sqrt(1/D)` at propose time".
pub struct FixedStepProposal {
    pub sigma: f64,
    rng: SmallRng,
}

impl FixedStepProposal {
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            rng: SmallRng::from_entropy(),
        }
    }
}

impl Default for FixedStepProposal {
    fn default() -> Self {
        Self::new(-1.0)
    }
}

impl Propose for FixedStepProposal {
    fn propose(
        &mut self,
        proposal: &mut [f64],
        current: &[f64],
        _value: f64,
        _accepted: Option<bool>,
    ) -> Result<()> {
        if proposal.len() != current.len() {
            return Err(SamplerError::DimensionMismatch {
                expected: current.len(),
                got: proposal.len(),
            });
        }
        let mut sigma = self.sigma;
        if sigma < 0.0 {
            sigma = (1.0 / current.len() as f64).sqrt();
        }
        for (p, &c) in proposal.iter_mut().zip(current.iter()) {
            let r: f64 = self.rng.sample(StandardNormal);
            *p = c + sigma * r;
        }
        Ok(())
    }

    fn set_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Drives the engine like a chain would: every call pretends the
    /// previous proposal was accepted and feeds the proposal back in as the
    /// new current point.
    fn drive(engine: &mut AdaptiveProposal, start: &[f64], steps: usize) -> Vec<f64> {
        let mut current = start.to_vec();
        let mut proposal = vec![0.0; start.len()];
        let mut outcome = None;
        for _ in 0..steps {
            let value = -0.5 * current.iter().map(|x| x * x).sum::<f64>();
            engine
                .propose(&mut proposal, &current, value, outcome)
                .unwrap();
            current.copy_from_slice(&proposal);
            outcome = Some(true);
        }
        current
    }

    #[test]
    fn first_use_sizes_everything() {
        let mut engine = AdaptiveProposal::new().set_seed(1);
        drive(&mut engine, &[0.0, 0.0, 0.0], 1);
        assert_eq!(engine.dim(), 3);
        assert_eq!(engine.mean().len(), 3);
        assert_eq!(engine.covariance().nrows(), 3);
        // First reset re-seeds sigma from zero.
        assert_abs_diff_eq!(engine.sigma(), (1.0f64 / 3.0).sqrt(), epsilon = 1e-3);
    }

    #[test]
    fn covariance_stays_symmetric() {
        let mut engine = AdaptiveProposal::new().set_seed(2);
        drive(&mut engine, &[1.0, -1.0, 0.5, 2.0], 500);
        let cov = engine.covariance();
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(cov[(i, j)], cov[(j, i)], "asymmetry at ({}, {})", i, j);
            }
        }
    }

    #[test]
    fn refreshed_factor_reproduces_covariance() {
        let mut engine = AdaptiveProposal::new().set_seed(3);
        drive(&mut engine, &[0.0, 0.0], 2000);
        engine.update_proposal();
        let u = engine.cholesky().clone();
        let reconstructed = u.transpose() * &u;
        let cov = engine.covariance();
        for i in 0..2 {
            for j in 0..2 {
                assert_abs_diff_eq!(reconstructed[(i, j)], cov[(i, j)], epsilon = 1e-10);
            }
        }
        // Strictly positive eigenvalues: the factor's diagonal is nonzero.
        for i in 0..2 {
            assert!(u[(i, i)] > 0.0);
        }
    }

    #[test]
    fn sigma_stays_positive_and_finite() {
        let mut engine = AdaptiveProposal::new().set_seed(4);
        let mut current = vec![0.0; 3];
        let mut proposal = vec![0.0; 3];
        // Alternate accepted and rejected updates for a while.
        for step in 0..5000 {
            let accepted = step % 3 == 0;
            let value = -0.5 * current.iter().map(|x| x * x).sum::<f64>();
            engine
                .propose(&mut proposal, &current, value, Some(accepted))
                .unwrap();
            if accepted {
                current.copy_from_slice(&proposal);
            }
            assert!(engine.sigma() > 0.0 && engine.sigma().is_finite());
            assert!((0.0..=1.0).contains(&engine.acceptance()));
        }
    }

    #[test]
    fn reset_recenters_on_last_point() {
        let mut engine = AdaptiveProposal::new().set_seed(5);
        drive(&mut engine, &[0.0, 0.0], 100);

        // Feed one more known point so the cached state is predictable.
        let point = [3.25, -1.5];
        let mut proposal = [0.0; 2];
        engine.propose(&mut proposal, &point, -1.0, Some(true)).unwrap();

        engine.reset_proposal();
        assert_eq!(engine.trials(), 0);
        assert_eq!(engine.successes(), 0);
        assert_abs_diff_eq!(engine.acceptance(), DEFAULT_TARGET_ACCEPTANCE, epsilon = 1e-12);
        for i in 0..2 {
            assert_abs_diff_eq!(engine.mean()[i], point[i], epsilon = 1e-12);
        }
        // Back to the diagonal guess.
        assert_eq!(engine.covariance()[(0, 1)], 0.0);
        assert_eq!(engine.covariance()[(0, 0)], 1.0);
    }

    #[test]
    fn gaussian_hint_seeds_the_diagonal() {
        let mut engine = AdaptiveProposal::new().set_seed(6);
        engine.set_dim(2);
        engine.set_gaussian(1, 3.0);
        // The very first update already folds one residual into the
        // estimate, so the seeded diagonal is only approximate.
        drive(&mut engine, &[0.0, 0.0], 1);
        assert_abs_diff_eq!(engine.covariance()[(0, 0)], 1.0, epsilon = 0.01);
        assert_abs_diff_eq!(engine.covariance()[(1, 1)], 9.0, epsilon = 0.05);
        assert_eq!(engine.covariance()[(0, 1)], 0.0);
    }

    #[test]
    fn invalid_configuration_is_ignored() {
        let mut engine = AdaptiveProposal::new();
        engine.set_dim(2);
        engine.set_gaussian(7, 1.0); // out of range
        engine.set_gaussian(0, -1.0); // non-positive width
        engine.set_uniform(1, 5.0, 5.0); // empty interval
        assert_eq!(engine.kinds[0], ProposalKind::Gaussian { sigma: None });
        assert_eq!(engine.kinds[1], ProposalKind::Gaussian { sigma: None });
        engine.set_dim(9); // redundant
        assert_eq!(engine.dim(), 2);
    }

    #[test]
    fn uniform_dimension_draws_inside_bounds() {
        let mut engine = AdaptiveProposal::new().set_seed(7);
        engine.set_dim(3);
        engine.set_uniform(2, -5.0, 5.0);
        let mut current = vec![0.0; 3];
        let mut proposal = vec![0.0; 3];
        let mut outcome = None;
        for _ in 0..200 {
            let value = -0.5 * (current[0] * current[0] + current[1] * current[1]);
            engine
                .propose(&mut proposal, &current, value, outcome)
                .unwrap();
            assert!((-5.0..5.0).contains(&proposal[2]));
            current.copy_from_slice(&proposal);
            outcome = Some(true);
        }
    }

    #[test]
    fn movement_heuristic_counts_standing_still_as_rejection() {
        let mut engine = AdaptiveProposal::new().set_seed(8);
        let current = [1.0, 2.0];
        let mut proposal = [0.0; 2];
        // Same point and value every time, no explicit outcome: after the
        // initializing call, every further trial must count as rejected.
        for _ in 0..10 {
            engine.propose(&mut proposal, &current, -2.5, None).unwrap();
        }
        assert_eq!(engine.trials(), 10);
        assert_eq!(engine.successes(), 0);
    }

    #[test]
    fn degenerate_covariance_recovers_through_safeguards() {
        let mut engine = AdaptiveProposal::new().set_seed(9);
        drive(&mut engine, &[0.0, 0.0], 50);

        // Force a perfectly correlated, singular estimate.
        engine.cov[(0, 0)] = 1.0;
        engine.cov[(1, 1)] = 1.0;
        engine.cov[(0, 1)] = 1.0;
        engine.cov[(1, 0)] = 1.0;
        engine.update_proposal();

        // The positive tail was capped and the factor is usable again.
        assert_abs_diff_eq!(engine.covariance()[(0, 1)], 0.95 * 0.95, epsilon = 1e-12);
        let u = engine.cholesky();
        assert!(u[(0, 0)] > 0.0 && u[(1, 1)] > 0.0);
    }

    #[test]
    fn collapsed_variance_is_floored() {
        let mut engine = AdaptiveProposal::new().set_seed(10);
        drive(&mut engine, &[0.0, 0.0], 50);

        engine.cov[(0, 0)] = 0.0;
        engine.cov[(1, 1)] = 1.0;
        engine.cov[(0, 1)] = 0.0;
        engine.cov[(1, 0)] = 0.0;
        engine.update_proposal();

        let floor = f64::EPSILON.sqrt();
        assert!(engine.covariance()[(0, 0)] >= floor);
        assert!(engine.cholesky()[(0, 0)] > 0.0);
    }

    #[test]
    fn anticorrelated_failure_falls_back_to_reset() {
        let mut engine = AdaptiveProposal::new().set_seed(11);
        drive(&mut engine, &[0.0, 0.0], 50);
        assert!(engine.trials() > 0);

        // Perfect anti-correlation: the cap only clamps the positive tail,
        // so both decomposition attempts fail and the engine resets.
        engine.cov[(0, 0)] = 1.0;
        engine.cov[(1, 1)] = 1.0;
        engine.cov[(0, 1)] = -1.0;
        engine.cov[(1, 0)] = -1.0;
        engine.update_proposal();

        assert_eq!(engine.trials(), 0);
        assert_eq!(engine.covariance()[(0, 1)], 0.0);
        assert_eq!(engine.covariance()[(0, 0)], 1.0);
    }

    #[test]
    fn fixed_step_defaults_to_dimension_scaled_width() {
        let mut engine = FixedStepProposal::default().set_seed(12);
        let current = [0.0; 4];
        let mut proposal = [0.0; 4];
        engine.propose(&mut proposal, &current, 0.0, None).unwrap();
        // Draws are centered on the current point with width 0.5; anything
        // beyond 6 sigma would be astonishing.
        for p in proposal {
            assert!(p.abs() < 3.0);
        }
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let mut engine = AdaptiveProposal::new();
        let mut short = [0.0; 2];
        let err = engine.propose(&mut short, &[0.0; 3], 0.0, None).unwrap_err();
        assert!(matches!(err, SamplerError::DimensionMismatch { expected: 3, got: 2 }));
    }
}
