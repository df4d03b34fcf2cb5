//! Proximal gradient solvers for penalized maximum likelihood over branch lengths
//!
//! All solvers minimize `-loglikelihood(x) + penalty(w * x)` subject to `x >= 0`.
//! [ista] runs plain proximal gradient descent with backtracking, [fista] adds
//! Nesterov momentum with adaptive restarts, and [adaptive] repeatedly calls [fista]
//! with reweighted penalties.

use crate::model::Model;
use crate::routines::proximal::Penalty;
use crate::routines::settings::Solver;
use crate::structs::trace::ObjectiveTrace;
use crate::structs::weights::PenaltyWeights;
use eyre::{bail, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

pub mod adaptive;
pub mod fista;
pub mod ista;

pub const MAX_ITER: usize = 1000;
pub const ABSTOL: f64 = 1e-4;
pub const MIN_STEP_SIZE: f64 = 5e-8;
pub const MAX_BACKTRACKS: usize = 200;

/// Why a solver stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// The penalized objective changed by less than the absolute tolerance
    Converged,
    /// The iteration cap was reached
    MaxIterReached,
    /// No step size satisfied the sufficient decrease condition
    Stalled,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Converged => write!(f, "Converged"),
            Status::MaxIterReached => write!(f, "Maximum iterations reached"),
            Status::Stalled => write!(f, "Stalled in line search"),
        }
    }
}

/// Result of a single solver run
#[derive(Debug, Clone)]
pub struct SolverResult {
    /// Final branch lengths, all non-negative
    pub branches: Array1<f64>,
    /// Log-likelihood and penalized objective of every accepted iterate
    pub trace: ObjectiveTrace,
    /// Step size at termination, usable as a warm start
    pub step_size: f64,
    /// Number of iterations executed, restarts included
    pub iterations: usize,
    /// Number of momentum restarts (always zero for [ista::ista])
    pub restarts: usize,
    /// Total number of step size reductions during backtracking
    pub backtracks: usize,
    pub status: Status,
}

impl SolverResult {
    pub fn loglik(&self) -> f64 {
        self.trace.last().map(|(ll, _)| ll).unwrap_or(f64::NEG_INFINITY)
    }

    pub fn penalized(&self) -> f64 {
        self.trace
            .last()
            .map(|(_, pen)| pen)
            .unwrap_or(f64::NEG_INFINITY)
    }
}

/// An accepted proximal gradient step
struct Proposal {
    branches: Array1<f64>,
    loglik: f64,
}

/// Everything a backtracking search needs besides the step size
struct LineSearch<'a, M: Model> {
    model: &'a M,
    tree: &'a M::Tree,
    penalty: Penalty,
    gamma: f64,
    weights: &'a PenaltyWeights,
    /// `gamma * w`, the threshold per unit step size
    thresholds: Array1<f64>,
    max_backtracks: usize,
    shrink: f64,
}

impl<'a, M: Model> LineSearch<'a, M> {
    fn new(
        model: &'a M,
        tree: &'a M::Tree,
        penalty: Penalty,
        gamma: f64,
        weights: &'a PenaltyWeights,
        solver: &Solver,
    ) -> Self {
        Self {
            model,
            tree,
            penalty,
            gamma,
            weights,
            thresholds: weights.weights() * gamma,
            max_backtracks: solver.max_backtracks,
            shrink: solver.shrink,
        }
    }

    /// Penalized objective of `branches`, given their log-likelihood
    fn penalized(&self, branches: &Array1<f64>, loglik: f64) -> f64 {
        loglik - self.penalty.value(&(branches * self.weights.weights()), self.gamma)
    }

    /// Backtracking search for a proximal gradient step from `anchor`.
    ///
    /// `grad` is the gradient of the negative log-likelihood at `anchor`. The step size
    /// is shrunk until the quadratic majorization of `-loglikelihood` around `anchor`
    /// holds at the proposal. Returns `None` if no proposal is accepted within the
    /// retry cap, or once the step size is no longer a positive number.
    fn search(
        &self,
        anchor: &Array1<f64>,
        anchor_ll: f64,
        grad: &Array1<f64>,
        step: &mut f64,
        backtracks: &mut usize,
    ) -> Option<Proposal> {
        for _ in 0..self.max_backtracks {
            if !(step.is_finite() && *step > 0.0) {
                return None;
            }
            let forward = anchor - &(grad * *step);
            let proposal = self
                .penalty
                .prox(&forward, &(&self.thresholds * *step))
                .mapv(|b| b.max(0.0));
            let loglik = self.model.loglikelihood(self.tree, &proposal);

            let diff = &proposal - anchor;
            let bound = -anchor_ll + grad.dot(&diff) + diff.dot(&diff) / (2.0 * *step);
            if loglik.is_finite() && -loglik <= bound {
                return Some(Proposal {
                    branches: proposal,
                    loglik,
                });
            }
            *step *= self.shrink;
            *backtracks += 1;
        }
        None
    }
}

/// Check the inputs shared by all solvers
fn validate_inputs(
    branches: &Array1<f64>,
    weights: &PenaltyWeights,
    gamma: f64,
    penalty: Penalty,
) -> Result<()> {
    penalty.validate()?;
    if branches.is_empty() {
        bail!("Cannot optimize an empty branch vector");
    }
    if branches.len() != weights.len() {
        bail!(
            "Branch vector has {} entries but {} weights were given",
            branches.len(),
            weights.len()
        );
    }
    if branches.iter().any(|b| !b.is_finite() || *b < 0.0) {
        bail!("Initial branch lengths must be finite and non-negative");
    }
    if !weights.is_valid() {
        bail!("Penalty weights must be finite and strictly positive");
    }
    if !(gamma.is_finite() && gamma >= 0.0) {
        bail!("Penalty strength must be non-negative, got {}", gamma);
    }
    Ok(())
}

/// Whether the last accepted iterate changed the penalized objective by less than `abstol`
fn converged(trace: &ObjectiveTrace, abstol: Option<f64>) -> bool {
    match (abstol, trace.last_change()) {
        (Some(tol), Some(change)) => change < tol,
        _ => false,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Quadratic;
    use super::*;
    use ndarray::array;

    #[test]
    fn line_search_shrinks_until_majorized() {
        let model = Quadratic::new(vec![0.3], 1000.0);
        let solver = Solver {
            step_size: 1.0,
            ..Solver::default()
        };
        let weights = PenaltyWeights::uniform(1);
        let search = LineSearch::new(&model, &(), Penalty::L1, 0.0, &weights, &solver);
        let anchor = array![0.1];
        let grad = -model.gradient(&(), &anchor);
        let mut step = 1.0;
        let mut backtracks = 0;
        let accepted = search
            .search(&anchor, model.loglikelihood(&(), &anchor), &grad, &mut step, &mut backtracks)
            .unwrap();
        assert!(backtracks >= 1);
        assert!(step <= 0.5);
        assert!((accepted.branches[0] - 0.3).abs() < 0.1);
    }

    #[test]
    fn line_search_gives_up_after_cap() {
        let model = Quadratic::new(vec![0.3], 1000.0);
        let solver = Solver {
            step_size: 1.0,
            max_backtracks: 3,
            ..Solver::default()
        };
        let weights = PenaltyWeights::uniform(1);
        let search = LineSearch::new(&model, &(), Penalty::L1, 0.0, &weights, &solver);
        let anchor = array![0.1];
        let grad = -model.gradient(&(), &anchor);
        let mut step = 1.0;
        let mut backtracks = 0;
        let accepted = search.search(
            &anchor,
            model.loglikelihood(&(), &anchor),
            &grad,
            &mut step,
            &mut backtracks,
        );
        assert!(accepted.is_none());
        assert_eq!(backtracks, 3);
        assert_eq!(step, 0.125);
    }

    #[test]
    fn rejects_mismatched_inputs() {
        let weights = PenaltyWeights::uniform(2);
        assert!(validate_inputs(&array![0.1, 0.2, 0.3], &weights, 0.1, Penalty::L1).is_err());
        assert!(validate_inputs(&array![0.1, -0.2], &weights, 0.1, Penalty::L1).is_err());
        assert!(validate_inputs(&array![0.1, 0.2], &weights, -0.1, Penalty::L1).is_err());
        let zero_weight = PenaltyWeights::from_vec(vec![1.0, 0.0]);
        assert!(validate_inputs(&array![0.1, 0.2], &zero_weight, 0.1, Penalty::L1).is_err());
        assert!(validate_inputs(&array![0.1, 0.2], &weights, 0.1, Penalty::Scad { a: 2.0 }).is_err());
        assert!(validate_inputs(&array![0.1, 0.0], &weights, 0.0, Penalty::L1).is_ok());
    }
}
