//! A small demo: sample a correlated 2D Gaussian with the adaptive
//! proposal, stream the accepted points to a CSV file and print summary
//! statistics.

use std::error::Error;

use nalgebra::{Matrix2, Vector2};

use adaptive_mcmc::distributions::Gaussian2D;
use adaptive_mcmc::io::CsvSink;
use adaptive_mcmc::metropolis::AdaptiveMetropolis;
use adaptive_mcmc::stats;

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    const BURNIN: usize = 20_000;
    const ITERATIONS: usize = 200_000;
    const SEED: u64 = 42;

    let target = Gaussian2D {
        mean: Vector2::new(0.0, 0.0),
        cov: Matrix2::new(2.0, 1.0, 1.0, 2.0),
    };

    let sink = CsvSink::create("samples.csv")?;
    let mut mcmc = AdaptiveMetropolis::new(target)
        .set_seed(SEED)
        .with_sink(sink);

    mcmc.start(&[10.0, 12.0], false)?;
    for _ in 0..BURNIN {
        mcmc.step(false)?;
    }
    // Forget the path to equilibrium before the recorded run.
    mcmc.proposal_mut().reset_proposal();

    let samples = mcmc.run_with_progress(ITERATIONS, 0)?;
    mcmc.finish()?;

    println!("Generated {} samples (samples.csv)", samples.nrows());
    println!(
        "Acceptance rate {:.3} with proposal width {:.4}",
        mcmc.proposal().acceptance(),
        mcmc.proposal().sigma()
    );

    let mean = samples.row_mean();
    println!("Mean: ({:.3}, {:.3})", mean[0], mean[1]);
    let cov = stats::cov(&samples)?;
    println!("Recovered covariance:");
    println!("  [{:.3}, {:.3}]", cov[(0, 0)], cov[(0, 1)]);
    println!("  [{:.3}, {:.3}]", cov[(1, 0)], cov[(1, 1)]);
    Ok(())
}
