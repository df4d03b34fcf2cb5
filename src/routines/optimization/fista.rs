//! Fast Iterative Shrinkage-Thresholding Algorithm (FISTA) with adaptive restarts

use super::{converged, validate_inputs, LineSearch, SolverResult, Status};
use crate::model::Model;
use crate::routines::proximal::Penalty;
use crate::routines::settings::Solver;
use crate::structs::trace::ObjectiveTrace;
use crate::structs::weights::PenaltyWeights;
use eyre::Result;
use ndarray::Array1;

/// Minimize `-loglikelihood(x) + penalty(w * x)` over `x >= 0` with FISTA.
///
/// The gradient and the line search are evaluated at the extrapolated point
/// `y = max(0, x + (j / (j + 3)) (x - x_prev))`, where `j` counts the iterations since the
/// last restart. The momentum is restarted, and the step size restored to
/// `solver.step_size`, when
/// - the log-likelihood at `y` is not finite,
/// - the step size decayed below `solver.min_step_size` (if `solver.step_size_restart`),
/// - no step size is accepted by the line search while momentum is active.
///
/// A restarted iteration performs no proximal update. If the line search fails at an
/// iterate without momentum the solver stops with [Status::Stalled].
pub fn fista<M: Model>(
    model: &M,
    tree: &M::Tree,
    branches: &Array1<f64>,
    gamma: f64,
    weights: &PenaltyWeights,
    penalty: Penalty,
    solver: &Solver,
) -> Result<SolverResult> {
    solver.validate()?;
    validate_inputs(branches, weights, gamma, penalty)?;

    let search = LineSearch::new(model, tree, penalty, gamma, weights, solver);
    let mut x = branches.clone();
    let mut x_prev = branches.clone();
    let mut step = solver.step_size;
    let mut trace = ObjectiveTrace::new();
    let mut restart = 0;
    let mut restarts = 0;
    let mut backtracks = 0;
    let mut iterations = 0;
    let mut status = Status::MaxIterReached;

    let initial_ll = model.loglikelihood(tree, &x);
    trace.push(initial_ll, search.penalized(&x, initial_ll));

    for k in 0..solver.max_iter {
        iterations = k + 1;
        let since_restart = (k - restart) as f64;
        let momentum = since_restart / (since_restart + 3.0);
        let y = (&x + &((&x - &x_prev) * momentum)).mapv(|b| b.max(0.0));

        let curr_ll = model.loglikelihood(tree, &y);
        let reason = if !curr_ll.is_finite() {
            Some("current log-likelihood is not finite")
        } else if solver.step_size_restart && step < solver.min_step_size {
            Some("step size too small")
        } else {
            None
        };
        if let Some(reason) = reason {
            log_restart(solver.monitor, k, step, reason);
            restart = k + 1;
            restarts += 1;
            step = solver.step_size;
            continue;
        }

        let grad = -model.gradient(tree, &y);
        let proposal = match search.search(&y, curr_ll, &grad, &mut step, &mut backtracks) {
            Some(proposal) => proposal,
            None if k == restart => {
                tracing::warn!(
                    "Iteration {}: no step size satisfied the line search, stopping",
                    k
                );
                status = Status::Stalled;
                break;
            }
            None => {
                log_restart(solver.monitor, k, step, "line search failed");
                restart = k + 1;
                restarts += 1;
                step = solver.step_size;
                continue;
            }
        };

        x_prev = std::mem::replace(&mut x, proposal.branches);
        let penalized = search.penalized(&x, proposal.loglik);
        trace.push(proposal.loglik, penalized);
        tracing::trace!(
            "Iteration {}: loglik {:.6}, penalized {:.6}, step size {:.3e}",
            k,
            proposal.loglik,
            penalized,
            step
        );

        if converged(&trace, solver.abstol) {
            status = Status::Converged;
            break;
        }
    }

    Ok(SolverResult {
        branches: x,
        trace,
        step_size: step,
        iterations,
        restarts,
        backtracks,
        status,
    })
}

fn log_restart(monitor: bool, iteration: usize, step: f64, reason: &str) {
    if monitor {
        tracing::info!(
            "Iteration {}; step size {:.3e}; {}, restarting...",
            iteration,
            step,
            reason
        );
    } else {
        tracing::debug!(
            "Iteration {}; step size {:.3e}; {}, restarting...",
            iteration,
            step,
            reason
        );
    }
}
