//! Running summary statistics for streamed chains, plus a sample
//! covariance helper for collected runs.

use ndarray::prelude::*;
use nalgebra as na;
use num_traits::Num;
use std::error::Error;

/// Tracks per-dimension mean and variance of a chain without storing the
/// samples.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainTracker {
    n: usize,
    mean: Array1<f64>,    // n_params
    mean_sq: Array1<f64>, // n_params
    n_params: usize,
}

impl ChainTracker {
    pub fn new(n_params: usize) -> Self {
        Self {
            n: 0,
            mean: Array1::<f64>::zeros(n_params),
            mean_sq: Array1::<f64>::zeros(n_params),
            n_params,
        }
    }

    /// Fold one point into the running estimates.
    pub fn step<T>(&mut self, x: &[T]) -> Result<(), Box<dyn Error>>
    where
        T: Num + num_traits::ToPrimitive + Clone + PartialOrd,
    {
        self.n += 1;

        let n = self.n as f64;
        let x_arr =
            ndarray::ArrayView1::<T>::from_shape(self.n_params, x)?.mapv(|x| x.to_f64().unwrap());

        self.mean = (self.mean.clone() * (n - 1.0) + x_arr.clone()) / n;
        if self.n == 1 {
            self.mean_sq = x_arr.pow2();
        } else {
            self.mean_sq = (self.mean_sq.clone() * (n - 1.0) + x_arr.pow2()) / n;
        }
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.n
    }

    /// Per-dimension mean over everything seen so far.
    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    /// Per-dimension sample variance (with the n/(n-1) correction).
    pub fn sm2(&self) -> Array1<f64> {
        let n = self.n as f64;
        (self.mean_sq.clone() - self.mean.pow2()) * n / (n - 1.0)
    }
}

/// Sample covariance of a matrix whose rows are observations.
pub fn cov(data: &na::DMatrix<f64>) -> Result<na::DMatrix<f64>, Box<dyn Error + Send + Sync>> {
    let n = data.nrows();
    if n < 2 {
        return Err("need at least two samples to estimate a covariance".into());
    }
    let mean = data.row_mean();
    let mut centered = data.clone_owned();
    for j in 0..centered.ncols() {
        let m = mean[j];
        for i in 0..centered.nrows() {
            centered[(i, j)] -= m;
        }
    }
    Ok(centered.transpose() * &centered / (n as f64 - 1.0))
}
