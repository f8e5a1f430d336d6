//! Shared plumbing: the sampler error type and the crate-wide [`Result`]
//! alias.

use thiserror::Error;

/// Errors surfaced by the sampler driver and the proposal engines.
///
/// Numerical trouble inside the adaptive proposal (a failed Cholesky
/// decomposition) is handled internally and never appears here; non-fatal
/// configuration mistakes are reported through the `log` facade instead.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SamplerError {
    /// `step` was called before `start` seeded the chain.
    #[error("sampler has no starting point; call start() before step()")]
    Uninitialized,

    /// The proposal and current vectors disagree about the dimensionality.
    #[error("dimension mismatch: expected {expected} parameters, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A record sink failed to append a record.
    #[error("failed to append record to sink")]
    Sink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, SamplerError>;
