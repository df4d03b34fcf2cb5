//! Iterative Shrinkage-Thresholding Algorithm (ISTA)
// Proximal gradient descent on the LASSO-penalized negative log-likelihood with
// backtracking line search, without momentum.

use super::{converged, validate_inputs, LineSearch, SolverResult, Status};
use crate::model::Model;
use crate::routines::proximal::Penalty;
use crate::routines::settings::Solver;
use crate::structs::trace::ObjectiveTrace;
use crate::structs::weights::PenaltyWeights;
use eyre::Result;
use ndarray::Array1;

/// Minimize `-loglikelihood(x) + gamma * ||w * x||_1` over `x >= 0` with ISTA.
///
/// Each iteration takes a gradient step from the current point, soft-thresholds it and
/// backtracks (shrinking the step size by `solver.shrink`) until the step satisfies the
/// sufficient decrease condition. The step size is restored to `solver.step_size`
/// whenever it has decayed below `solver.min_step_size`.
///
/// Stops when the penalized objective changes by less than `solver.abstol`, after
/// `solver.max_iter` iterations, or when no step size is accepted within
/// `solver.max_backtracks` reductions.
pub fn ista<M: Model>(
    model: &M,
    tree: &M::Tree,
    branches: &Array1<f64>,
    gamma: f64,
    weights: &PenaltyWeights,
    solver: &Solver,
) -> Result<SolverResult> {
    solver.validate()?;
    validate_inputs(branches, weights, gamma, Penalty::L1)?;

    let search = LineSearch::new(model, tree, Penalty::L1, gamma, weights, solver);
    let mut x = branches.clone();
    let mut step = solver.step_size;
    let mut trace = ObjectiveTrace::new();
    let mut backtracks = 0;
    let mut iterations = 0;
    let mut status = Status::MaxIterReached;

    let mut curr_ll = model.loglikelihood(tree, &x);
    trace.push(curr_ll, search.penalized(&x, curr_ll));

    for k in 0..solver.max_iter {
        iterations = k + 1;
        let grad = -model.gradient(tree, &x);
        if step < solver.min_step_size {
            step = solver.step_size;
        }

        let proposal = match search.search(&x, curr_ll, &grad, &mut step, &mut backtracks) {
            Some(proposal) => proposal,
            None => {
                tracing::warn!(
                    "Iteration {}: no step size satisfied the line search, stopping",
                    k
                );
                status = Status::Stalled;
                break;
            }
        };

        x = proposal.branches;
        curr_ll = proposal.loglik;
        trace.push(curr_ll, search.penalized(&x, curr_ll));
        tracing::trace!(
            "Iteration {}: loglik {:.6}, penalized {:.6}, step size {:.3e}",
            k,
            curr_ll,
            search.penalized(&x, curr_ll),
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
        restarts: 0,
        backtracks,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::optimization::testing::Quadratic;
    use ndarray::array;

    fn solver(step_size: f64) -> Solver {
        Solver {
            step_size,
            ..Solver::default()
        }
    }

    #[test]
    fn penalized_objective_never_decreases() {
        let model = Quadratic::new(vec![0.1, 0.002, 0.3, 0.05, 0.2], 50.0);
        let result = ista(
            &model,
            &(),
            &array![0.5, 0.5, 0.5, 0.5, 0.5],
            0.05,
            &PenaltyWeights::uniform(5),
            &Solver {
                abstol: Some(1e-10),
                ..solver(0.1)
            },
        )
        .unwrap();
        for pair in result.trace.penalized().windows(2) {
            assert!(pair[1] >= pair[0] - 1e-12, "{:?}", pair);
        }
        assert!(result.branches.iter().all(|b| *b >= 0.0));
    }

    #[test]
    fn unpenalized_fixed_point_is_the_maximum_likelihood_estimate() {
        let model = Quadratic::new(vec![0.1, 0.2, 0.3], 10.0);
        let result = ista(
            &model,
            &(),
            &array![1.0, 1.0, 1.0],
            0.0,
            &PenaltyWeights::uniform(3),
            &Solver {
                abstol: Some(1e-12),
                ..solver(0.05)
            },
        )
        .unwrap();
        assert_eq!(result.status, Status::Converged);
        for (b, t) in result.branches.iter().zip(model.target.iter()) {
            assert!((b - t).abs() < 1e-4, "{} vs {}", b, t);
        }
        // Unpenalized, both objectives coincide
        assert_eq!(result.loglik(), result.penalized());
        assert_eq!(Some(result.loglik()), result.trace.loglik().last().copied());
    }

    #[test]
    fn soft_thresholds_small_branches_to_zero() {
        let model = Quadratic::new(vec![0.2, 0.001], 10.0);
        let result = ista(
            &model,
            &(),
            &array![0.5, 0.5],
            0.1,
            &PenaltyWeights::uniform(2),
            &Solver {
                abstol: Some(1e-10),
                ..solver(0.05)
            },
        )
        .unwrap();
        // gamma / c below the target, zero for the short branch
        assert_eq!(result.branches[1], 0.0);
        assert!((result.branches[0] - 0.19).abs() < 1e-4);
    }

    #[test]
    fn backtracks_on_a_steep_likelihood() {
        let model = Quadratic::new(vec![0.3], 1000.0);
        let result = ista(
            &model,
            &(),
            &array![0.1],
            0.0,
            &PenaltyWeights::uniform(1),
            &Solver {
                max_iter: 1,
                ..solver(1.0)
            },
        )
        .unwrap();
        assert_eq!(result.iterations, 1);
        assert!(result.backtracks >= 1);
        assert!(result.step_size <= 0.5);
        assert_eq!(result.restarts, 0);
    }

    #[test]
    fn rejects_mismatched_weights() {
        let model = Quadratic::new(vec![0.1, 0.2, 0.3], 10.0);
        let result = ista(
            &model,
            &(),
            &array![1.0, 1.0, 1.0],
            0.1,
            &PenaltyWeights::uniform(2),
            &solver(0.05),
        );
        assert!(result.is_err());
    }
}
