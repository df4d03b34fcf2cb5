//! Adaptive LASSO: iteratively reweighted penalties around [fista]

use super::fista::fista;
use super::Status;
use crate::model::Model;
use crate::routines::diagnostics::count_zeros;
use crate::routines::proximal::Penalty;
use crate::routines::settings::{Adaptive, Solver};
use crate::structs::trace::ObjectiveTrace;
use crate::structs::weights::PenaltyWeights;
use eyre::{bail, eyre, Result};
use ndarray::Array1;
use serde::Serialize;

/// Summary of one reweighting cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle: usize,
    /// Iterations of the accelerated solver in this cycle
    pub iterations: usize,
    pub restarts: usize,
    /// Number of branches estimated as exactly zero
    pub zeros: usize,
    /// Penalty strength used in this cycle
    pub gamma: f64,
    /// Step size returned by the solver
    pub step_size: f64,
    pub status: Status,
}

/// Result of the adaptive scheduler
#[derive(Debug, Clone)]
pub struct AdaptiveResult {
    /// The solution of every cycle, in order
    pub solutions: Vec<Array1<f64>>,
    /// Objective traces of all cycles, concatenated
    pub trace: ObjectiveTrace,
    pub cycles: Vec<CycleSummary>,
    /// Step size carried out of the last cycle
    pub step_size: f64,
}

impl AdaptiveResult {
    /// Solution of the last cycle
    pub fn branches(&self) -> Option<&Array1<f64>> {
        self.solutions.last()
    }

    /// Number of zero branches per cycle
    pub fn zeros(&self) -> Vec<usize> {
        self.cycles.iter().map(|c| c.zeros).collect()
    }
}

/// Run [fista] for `adaptive.cycles` cycles, reweighting the penalty after each one.
///
/// The first cycle uses uniform weights. After each cycle the weights become
/// `1 / (x + eps)^p` of the cycle's solution, so that short branches are penalized more
/// heavily, and `gamma` is rescaled by the ratio of the previous to the current harmonic
/// mean of the weights. Each cycle starts from the previous solution and step size; a
/// step size that decayed below `solver.min_step_size` is restored to `solver.step_size`.
///
/// With the [Penalty::L2] penalty only the first cycle uses ridge shrinkage; the
/// reweighted cycles use [Penalty::reweighted].
pub fn adaptive_lasso<M: Model>(
    model: &M,
    tree: &M::Tree,
    branches: &Array1<f64>,
    gamma: f64,
    penalty: Penalty,
    solver: &Solver,
    adaptive: &Adaptive,
) -> Result<AdaptiveResult> {
    adaptive.validate()?;
    penalty.validate()?;
    let nbranches = model.nbranches();
    if branches.len() != nbranches {
        bail!(
            "Expected {} branch lengths for a tree with {} tips, got {}",
            nbranches,
            model.ntips(),
            branches.len()
        );
    }

    let mut weights = PenaltyWeights::uniform(nbranches);
    let mut x = branches.clone();
    let mut gamma = gamma;
    let mut step = solver.step_size;
    let mut mean_prev = 1.0;

    let mut solutions = Vec::with_capacity(adaptive.cycles);
    let mut summaries = Vec::with_capacity(adaptive.cycles);
    let mut trace = ObjectiveTrace::new();

    for m in 0..adaptive.cycles {
        let cycle_penalty = if m == 0 { penalty } else { penalty.reweighted() };
        let cycle_solver = Solver {
            step_size: step,
            ..solver.clone()
        };
        let result = fista(model, tree, &x, gamma, &weights, cycle_penalty, &cycle_solver)?;

        let summary = CycleSummary {
            cycle: m + 1,
            iterations: result.iterations,
            restarts: result.restarts,
            zeros: count_zeros(&result.branches),
            gamma,
            step_size: result.step_size,
            status: result.status,
        };
        if adaptive.sparsity_monitor {
            tracing::info!(
                "Cycle {}: [iterations {}; # zeros: {}; step size: {:.3e}]",
                summary.cycle,
                summary.iterations,
                summary.zeros,
                summary.step_size
            );
        } else {
            tracing::debug!(
                "Cycle {}: [iterations {}; # zeros: {}; step size: {:.3e}]",
                summary.cycle,
                summary.iterations,
                summary.zeros,
                summary.step_size
            );
        }

        step = result.step_size;
        if step < solver.min_step_size {
            step = solver.step_size;
        }

        weights = PenaltyWeights::adaptive(&result.branches, adaptive.exponent);
        let mean = weights
            .harmonic_mean()
            .ok_or_else(|| eyre!("Cannot average an empty weight vector"))?;
        gamma *= mean_prev / mean;
        mean_prev = mean;

        trace.extend(&result.trace);
        x = result.branches;
        solutions.push(x.clone());
        summaries.push(summary);
    }

    Ok(AdaptiveResult {
        solutions,
        trace,
        cycles: summaries,
        step_size: step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::optimization::testing::Quadratic;
    use ndarray::array;

    fn settings() -> (Solver, Adaptive) {
        (
            Solver {
                step_size: 0.01,
                ..Solver::default()
            },
            Adaptive::default(),
        )
    }

    #[test]
    fn returns_one_solution_per_cycle() {
        let model = Quadratic::new(vec![0.1, 0.0001, 0.3, 0.00005, 0.2], 1000.0);
        let (solver, adaptive) = settings();
        let result = adaptive_lasso(
            &model,
            &(),
            &array![0.5, 0.5, 0.5, 0.5, 0.5],
            0.01,
            Penalty::L1,
            &solver,
            &adaptive,
        )
        .unwrap();
        assert_eq!(result.solutions.len(), 4);
        assert_eq!(result.cycles.len(), 4);
        let total: usize = result.cycles.iter().map(|c| c.iterations).sum();
        // Every accepted iterate plus the initial point of each cycle
        assert!(result.trace.len() <= total + 4);
        assert_eq!(result.cycles[0].gamma, 0.01);
    }

    #[test]
    fn gamma_is_rescaled_by_harmonic_mean() {
        let model = Quadratic::new(vec![0.1, 0.0001, 0.3, 0.00005, 0.2], 1000.0);
        let (solver, adaptive) = settings();
        let result = adaptive_lasso(
            &model,
            &(),
            &array![0.5, 0.5, 0.5, 0.5, 0.5],
            0.01,
            Penalty::L1,
            &solver,
            &adaptive,
        )
        .unwrap();
        // The harmonic mean of 1 / (x + eps) is 1 / mean(x + eps)
        let first = &result.solutions[0];
        let expected = 0.01 * (first.mapv(|b| b + f64::EPSILON).sum() / 5.0);
        assert!((result.cycles[1].gamma - expected).abs() < 1e-12);
    }

    #[test]
    fn rejects_wrong_number_of_branches() {
        let model = Quadratic::new(vec![0.1, 0.2, 0.3], 10.0);
        let (solver, adaptive) = settings();
        let result = adaptive_lasso(
            &model,
            &(),
            &array![0.5, 0.5],
            0.01,
            Penalty::L1,
            &solver,
            &adaptive,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_degenerate_scad() {
        let model = Quadratic::new(vec![0.1, 0.2, 0.3], 10.0);
        let (solver, adaptive) = settings();
        let result = adaptive_lasso(
            &model,
            &(),
            &array![0.5, 0.5, 0.5],
            0.01,
            Penalty::Scad { a: 2.0 },
            &solver,
            &adaptive,
        );
        assert!(result.is_err());
    }

    #[test]
    fn ridge_start_then_sparse_cycles() {
        let model = Quadratic::new(vec![0.1, 0.0001, 0.3, 0.00005, 0.2], 1000.0);
        let (solver, adaptive) = settings();
        let result = adaptive_lasso(
            &model,
            &(),
            &array![0.5, 0.5, 0.5, 0.5, 0.5],
            0.01,
            Penalty::L2,
            &solver,
            &adaptive,
        )
        .unwrap();
        // Ridge never produces exact zeros, the reweighted L1 cycles do
        assert_eq!(result.cycles[0].zeros, 0);
        assert_eq!(result.cycles.last().unwrap().zeros, 2);
    }
}
