/*!
Defines the log-posterior interface consumed by the sampler, along with a
couple of Gaussian targets used by the tests and the demo binary.

The sampler only ever needs the *unnormalized* log-density: the
Metropolis-Hastings ratio cancels any normalization constant. A value of
`f64::NEG_INFINITY` marks a point with zero posterior mass; such a proposal
is always rejected.

# Examples

```rust
use adaptive_mcmc::distributions::{Gaussian2D, LogPosterior};
use nalgebra::{Matrix2, Vector2};

let target = Gaussian2D {
    mean: Vector2::new(0.0, 0.0),
    cov: Matrix2::new(1.0, 0.0, 0.0, 1.0),
};
let lp = target.log_posterior(&[0.5, -0.5]);
assert!(lp < 0.0);
```
*/

use nalgebra::{Matrix2, Vector2};

/// The user-supplied log-posterior (log-likelihood plus log-prior).
///
/// The callable must be deterministic: the sampler caches the value at the
/// current point and re-evaluates only at proposals. `-inf` is a legal
/// return and means "reject unconditionally"; `+inf` or `NaN` at the
/// starting point are caller errors.
pub trait LogPosterior {
    /// Log of the unnormalized posterior density at `point`.
    fn log_posterior(&self, point: &[f64]) -> f64;
}

/// Plain functions and closures work directly as targets.
impl<F: Fn(&[f64]) -> f64> LogPosterior for F {
    fn log_posterior(&self, point: &[f64]) -> f64 {
        self(point)
    }
}

/// Independent unit normals in every dimension, centered at zero.
///
/// The classic smoke-test target: the chain should recover zero mean and
/// unit variance per dimension for any dimensionality.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardGaussian;

impl LogPosterior for StandardGaussian {
    fn log_posterior(&self, point: &[f64]) -> f64 {
        -0.5 * point.iter().map(|x| x * x).sum::<f64>()
    }
}

/// A 2D Gaussian with a full covariance matrix.
///
/// Used to check that the adaptive proposal learns off-diagonal structure.
#[derive(Debug, Clone, Copy)]
pub struct Gaussian2D {
    pub mean: Vector2<f64>,
    pub cov: Matrix2<f64>,
}

impl LogPosterior for Gaussian2D {
    fn log_posterior(&self, point: &[f64]) -> f64 {
        let (a, b, c, d) = (
            self.cov[(0, 0)],
            self.cov[(0, 1)],
            self.cov[(1, 0)],
            self.cov[(1, 1)],
        );
        let det = a * d - b * c;
        let diff = Vector2::new(point[0], point[1]) - self.mean;
        let inv_cov = Matrix2::new(d, -b, -c, a) / det;
        -0.5 * (diff.transpose() * inv_cov * diff)[(0, 0)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn standard_gaussian_peaks_at_origin() {
        let target = StandardGaussian;
        assert_eq!(target.log_posterior(&[0.0, 0.0, 0.0]), 0.0);
        assert!(target.log_posterior(&[1.0, 0.0, 0.0]) < 0.0);
        assert_abs_diff_eq!(target.log_posterior(&[1.0, 2.0]), -2.5, epsilon = 1e-12);
    }

    #[test]
    fn gaussian_2d_matches_diagonal_case() {
        let target = Gaussian2D {
            mean: Vector2::new(0.0, 0.0),
            cov: Matrix2::new(1.0, 0.0, 0.0, 1.0),
        };
        // With identity covariance this reduces to the standard Gaussian.
        let reference = StandardGaussian;
        for point in [[0.3, -0.7], [1.5, 2.0], [-2.0, 0.1]] {
            assert_abs_diff_eq!(
                target.log_posterior(&point),
                reference.log_posterior(&point),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn gaussian_2d_correlation_raises_likelihood_along_diagonal() {
        let target = Gaussian2D {
            mean: Vector2::new(0.0, 0.0),
            cov: Matrix2::new(1.0, 0.9, 0.9, 1.0),
        };
        // Along the correlation direction the density falls off slower than
        // perpendicular to it.
        assert!(target.log_posterior(&[1.0, 1.0]) > target.log_posterior(&[1.0, -1.0]));
    }

    #[test]
    fn closures_are_targets() {
        let target = |point: &[f64]| -point[0].abs();
        assert_eq!(target.log_posterior(&[2.0]), -2.0);
    }
}
