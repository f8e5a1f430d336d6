//! Adaptive Metropolis-Hastings MCMC: a Metropolis driver paired with a
//! multivariate-Gaussian proposal whose covariance is learned continuously
//! from the chain's own history.

pub mod core;
pub mod distributions;
pub mod io;
pub mod metropolis;
pub mod proposal;
pub mod stats;
