use std::time::Instant;

use crate::model::Model;
use crate::routines::optimization::adaptive::{adaptive_lasso, CycleSummary};
use crate::routines::optimization::fista::fista;
use crate::routines::optimization::ista::ista;
use crate::routines::optimization::SolverResult;
use crate::routines::output::PhyloResult;
use crate::routines::proximal::Penalty;
use crate::routines::settings::Settings;
use crate::structs::weights::PenaltyWeights;
use eyre::{Result, WrapErr};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// The available optimization routines
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Algorithm {
    /// Proximal gradient descent with the L1 penalty
    ISTA,
    /// Accelerated proximal gradient with restarts
    FISTA,
    /// Adaptive LASSO, reweighted FISTA cycles
    ADALASSO,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::ISTA => write!(f, "ISTA"),
            Algorithm::FISTA => write!(f, "FISTA"),
            Algorithm::ADALASSO => write!(f, "Adaptive LASSO"),
        }
    }
}

/// Estimate sparse branch lengths of `tree` starting from `branches`, using the
/// algorithm and options in `settings`.
///
/// Result files are written to the output folder if `settings.output.write` is set.
pub fn fit<M: Model>(
    settings: &Settings,
    model: &M,
    tree: &M::Tree,
    branches: &Array1<f64>,
) -> Result<PhyloResult> {
    settings.validate()?;
    let now = Instant::now();
    let algorithm = settings.config.algorithm;
    let gamma = settings.penalty.gamma;
    let penalty = match algorithm {
        Algorithm::ISTA => Penalty::L1,
        _ => settings.penalty.penalty(),
    };
    tracing::info!(
        "Running {} with {} penalty, gamma = {}, on {} branches",
        algorithm,
        penalty,
        gamma,
        branches.len()
    );

    let result = match algorithm {
        Algorithm::ISTA => {
            let weights = PenaltyWeights::uniform(branches.len());
            let run = ista(model, tree, branches, gamma, &weights, &settings.solver)?;
            single_run(algorithm, penalty, gamma, run)
        }
        Algorithm::FISTA => {
            let weights = PenaltyWeights::uniform(branches.len());
            let run = fista(
                model,
                tree,
                branches,
                gamma,
                &weights,
                penalty,
                &settings.solver,
            )?;
            single_run(algorithm, penalty, gamma, run)
        }
        Algorithm::ADALASSO => {
            let run = adaptive_lasso(
                model,
                tree,
                branches,
                gamma,
                penalty,
                &settings.solver,
                &settings.adaptive,
            )?;
            PhyloResult::new(
                algorithm,
                penalty,
                run.solutions,
                run.trace,
                run.cycles,
                run.step_size,
            )
        }
    };

    if let Some(last) = result.cycles().last() {
        tracing::info!(
            "{} after {} iterations, {} of {} branches are zero",
            last.status,
            result.cycles().iter().map(|c| c.iterations).sum::<usize>(),
            last.zeros,
            branches.len()
        );
    }
    tracing::info!("Total time: {:.2?}", now.elapsed());

    if settings.output.write {
        settings.write()?;
        result
            .write_outputs(&settings.output.path)
            .wrap_err("Failed to write outputs")?;
    }

    Ok(result)
}

/// Wrap a single solver run as a one-cycle result
fn single_run(algorithm: Algorithm, penalty: Penalty, gamma: f64, run: SolverResult) -> PhyloResult {
    tracing::debug!(
        "Final log-likelihood {:.6}, penalized {:.6}",
        run.loglik(),
        run.penalized()
    );
    let summary = CycleSummary {
        cycle: 1,
        iterations: run.iterations,
        restarts: run.restarts,
        zeros: crate::routines::diagnostics::count_zeros(&run.branches),
        gamma,
        step_size: run.step_size,
        status: run.status,
    };
    PhyloResult::new(
        algorithm,
        penalty,
        vec![run.branches],
        run.trace,
        vec![summary],
        run.step_size,
    )
}
