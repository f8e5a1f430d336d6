/*!
# Metropolis-Hastings driver

[`AdaptiveMetropolis`] owns the chain: the current accepted point and its
cached log-posterior, the proposed point under trial, and an optional record
sink. Each [`step`](AdaptiveMetropolis::step) asks the proposal engine for a
trial point, evaluates the user's log-posterior there, and applies the
Metropolis accept/reject rule. The sampler is strictly sequential; records
land in the sink in exactly the order steps were taken.

## Example

```rust
use adaptive_mcmc::distributions::StandardGaussian;
use adaptive_mcmc::metropolis::AdaptiveMetropolis;

let mut mcmc = AdaptiveMetropolis::new(StandardGaussian).set_seed(42);
mcmc.start(&[5.0, -5.0], false).unwrap();
for _ in 0..1000 {
    mcmc.step(false).unwrap(); // burn-in, nothing recorded
}
let samples = mcmc.run(10_000, 0).unwrap();
assert_eq!(samples.shape(), (10_000, 2));
```
*/

use indicatif::{ProgressBar, ProgressStyle};
use nalgebra as na;
use rand::distributions::Open01;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::core::{Result, SamplerError};
use crate::distributions::LogPosterior;
use crate::io::{Record, RecordSink};
use crate::proposal::{AdaptiveProposal, Propose};

/// A Metropolis-Hastings sampler over a user-supplied log-posterior `L`,
/// with a pluggable proposal engine `P` (the adaptive engine by default).
///
/// The target is a type parameter rather than a trait object: it is called
/// on every step and inlining matters.
pub struct AdaptiveMetropolis<L, P = AdaptiveProposal> {
    target: L,
    proposal: P,
    accepted: Vec<f64>,
    accepted_value: f64,
    proposed: Vec<f64>,
    proposed_value: f64,
    trial_step: Vec<f64>,
    evaluations: u64,
    /// Outcome of the previous accept/reject decision, handed to the
    /// proposal engine so it doesn't have to guess.
    last_outcome: Option<bool>,
    started: bool,
    record_trial_steps: bool,
    sink: Option<Box<dyn RecordSink>>,
    rng: SmallRng,
}

impl<L: LogPosterior> AdaptiveMetropolis<L> {
    /// A sampler over `target` with a fresh adaptive proposal.
    pub fn new(target: L) -> Self {
        Self::with_proposal(target, AdaptiveProposal::new())
    }
}

impl<L: LogPosterior, P: Propose> AdaptiveMetropolis<L, P> {
    /// A sampler over `target` using a caller-configured proposal engine.
    pub fn with_proposal(target: L, proposal: P) -> Self {
        Self {
            target,
            proposal,
            accepted: Vec::new(),
            accepted_value: 0.0,
            proposed: Vec::new(),
            proposed_value: 0.0,
            trial_step: Vec::new(),
            evaluations: 0,
            last_outcome: None,
            started: false,
            record_trial_steps: false,
            sink: None,
            rng: SmallRng::from_entropy(),
        }
    }

    /// Seed the driver and its proposal engine for a reproducible chain.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self.proposal = self.proposal.set_seed(seed.wrapping_add(1));
        self
    }

    /// Attach a record sink; every `start`/`step` with `save == true`
    /// appends one record to it.
    pub fn with_sink<S: RecordSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Also record the trial step (proposed minus previous accepted) in
    /// each record.
    pub fn save_trial_steps(mut self, save: bool) -> Self {
        self.record_trial_steps = save;
        self
    }

    /// Write access to the proposal engine, e.g. to configure dimensions
    /// before `start` or to reset it after burn-in.
    pub fn proposal_mut(&mut self) -> &mut P {
        &mut self.proposal
    }

    pub fn proposal(&self) -> &P {
        &self.proposal
    }

    pub fn target(&self) -> &L {
        &self.target
    }

    /// The most recently accepted point.
    pub fn accepted(&self) -> &[f64] {
        &self.accepted
    }

    /// Log-posterior at the most recently accepted point.
    pub fn accepted_log_posterior(&self) -> f64 {
        self.accepted_value
    }

    /// The most recently proposed point (equal to the accepted point right
    /// after `start`).
    pub fn proposed(&self) -> &[f64] {
        &self.proposed
    }

    /// Log-posterior at the most recently proposed point.
    pub fn proposed_log_posterior(&self) -> f64 {
        self.proposed_value
    }

    /// Number of log-posterior evaluations so far (including the one in
    /// `start`).
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Seed the chain at `start`. The log-posterior is evaluated once and
    /// cached; if `save` is set one record is appended.
    pub fn start(&mut self, start: &[f64], save: bool) -> Result<()> {
        self.accepted.clear();
        self.accepted.extend_from_slice(start);
        self.proposed.clear();
        self.proposed.extend_from_slice(start);
        self.trial_step.clear();
        self.trial_step.resize(start.len(), 0.0);

        self.proposed_value = self.target.log_posterior(&self.proposed);
        self.evaluations += 1;
        self.accepted_value = self.proposed_value;
        self.last_outcome = None;
        self.started = true;

        if save {
            self.save_record(true)?;
        }
        Ok(())
    }

    /// Take one step. Returns whether the proposal was accepted.
    ///
    /// When `save` is set a record is appended whether or not the step was
    /// accepted, so the sink sees the full chain including repeats.
    pub fn step(&mut self, save: bool) -> Result<bool> {
        if !self.started {
            return Err(SamplerError::Uninitialized);
        }

        self.proposal.propose(
            &mut self.proposed,
            &self.accepted,
            self.accepted_value,
            self.last_outcome,
        )?;

        // Only worth computing when it ends up in a record.
        if save {
            for ((t, &p), &a) in self
                .trial_step
                .iter_mut()
                .zip(self.proposed.iter())
                .zip(self.accepted.iter())
            {
                *t = p - a;
            }
        }

        self.proposed_value = self.target.log_posterior(&self.proposed);
        self.evaluations += 1;

        let delta = self.proposed_value - self.accepted_value;
        let accept = if delta >= 0.0 {
            true
        } else {
            // A -inf delta compares below any ln(u), so zero-mass
            // proposals are always rejected.
            let u: f64 = self.rng.sample(Open01);
            delta >= u.ln()
        };

        if accept {
            self.accepted.copy_from_slice(&self.proposed);
            self.accepted_value = self.proposed_value;
        }
        self.last_outcome = Some(accept);

        if save {
            self.save_record(accept)?;
        }
        Ok(accept)
    }

    /// Drive the chain for `n_steps`, discarding the first `discard` as
    /// burn-in, and collect the accepted point after each kept step into
    /// the rows of a matrix. Burn-in steps are not recorded to the sink.
    pub fn run(&mut self, n_steps: usize, discard: usize) -> Result<na::DMatrix<f64>> {
        if !self.started {
            return Err(SamplerError::Uninitialized);
        }
        let dim = self.accepted.len();
        let keep = n_steps.saturating_sub(discard);
        let mut out = na::DMatrix::<f64>::zeros(keep, dim);

        for i in 0..n_steps {
            self.step(i >= discard)?;
            if i >= discard {
                out.row_mut(i - discard).copy_from_slice(&self.accepted);
            }
        }
        Ok(out)
    }

    /// Like [`run`](Self::run), with a progress bar.
    pub fn run_with_progress(&mut self, n_steps: usize, discard: usize) -> Result<na::DMatrix<f64>> {
        if !self.started {
            return Err(SamplerError::Uninitialized);
        }
        let pb = ProgressBar::new(n_steps as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("##-"),
        );

        let dim = self.accepted.len();
        let keep = n_steps.saturating_sub(discard);
        let mut out = na::DMatrix::<f64>::zeros(keep, dim);

        for i in 0..n_steps {
            self.step(i >= discard)?;
            if i >= discard {
                out.row_mut(i - discard).copy_from_slice(&self.accepted);
            }
            pb.inc(1);
        }
        pb.finish_with_message("Done!");
        Ok(out)
    }

    /// Flush the record sink, finalizing buffered file formats.
    pub fn finish(&mut self) -> Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            sink.finish().map_err(SamplerError::Sink)?;
        }
        Ok(())
    }

    fn save_record(&mut self, accepted: bool) -> Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            let record = Record {
                log_likelihood: self.accepted_value,
                point: &self.accepted,
                accepted,
                step: if self.record_trial_steps {
                    Some(&self.trial_step[..])
                } else {
                    None
                },
            };
            sink.append(&record).map_err(SamplerError::Sink)?;
        }
        Ok(())
    }
}
