//! Proximal operators and penalty values for the sparsity-inducing penalties
//!
//! All functions are pure and act elementwise; thresholds are given per coordinate.

use eyre::{bail, Result};
use ndarray::{Array1, Zip};
use serde::{Deserialize, Serialize};

/// Default shape constant of the SCAD penalty
pub const SCAD_A: f64 = 3.7;

/// The penalty applied to the branch lengths
///
/// Each variant carries what it needs to evaluate both its proximal map and its value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Penalty {
    /// LASSO, `gamma * ||x||_1`
    #[default]
    L1,
    /// Ridge-style shrinkage, `gamma * ||x||_2`
    L2,
    /// Smoothly Clipped Absolute Deviation with shape constant `a > 2`
    Scad { a: f64 },
}

impl Penalty {
    /// SCAD with the default shape constant
    pub fn scad() -> Self {
        Penalty::Scad { a: SCAD_A }
    }

    /// Check the shape constant of SCAD, which must be finite and exceed 2
    pub fn validate(&self) -> Result<()> {
        if let Penalty::Scad { a } = self {
            if !(a.is_finite() && *a > 2.0) {
                bail!("The SCAD shape constant must exceed 2, got {}", a);
            }
        }
        Ok(())
    }

    /// Proximal map of the penalty at `x` with per-coordinate threshold `thr`
    pub fn prox(&self, x: &Array1<f64>, thr: &Array1<f64>) -> Array1<f64> {
        match self {
            Penalty::L1 => prox_l1(x, thr),
            Penalty::L2 => prox_l2(x, thr),
            Penalty::Scad { a } => prox_scad(x, thr, *a),
        }
    }

    /// Value of the penalty at `x` with global strength `gamma`
    pub fn value(&self, x: &Array1<f64>, gamma: f64) -> f64 {
        match self {
            Penalty::L1 => gamma * x.mapv(f64::abs).sum(),
            Penalty::L2 => gamma * x.dot(x).sqrt(),
            Penalty::Scad { a } => penalty_scad(x, gamma, *a),
        }
    }

    /// Penalty used by the adaptive scheduler once weights have been derived.
    ///
    /// Ridge only provides the initial estimate; subsequent cycles are reweighted L1.
    pub fn reweighted(&self) -> Self {
        match self {
            Penalty::L2 => Penalty::L1,
            other => *other,
        }
    }
}

impl std::fmt::Display for Penalty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Penalty::L1 => write!(f, "l1"),
            Penalty::L2 => write!(f, "l2"),
            Penalty::Scad { a } => write!(f, "scad (a = {})", a),
        }
    }
}

/// Soft-thresholding, `max(0, x - thr) - max(0, -x - thr)`
pub fn prox_l1(x: &Array1<f64>, thr: &Array1<f64>) -> Array1<f64> {
    Zip::from(x)
        .and(thr)
        .map_collect(|&x, &t| (x - t).max(0.0) - (-x - t).max(0.0))
}

/// Ridge shrinkage, `x / (1 + 2 thr)`
pub fn prox_l2(x: &Array1<f64>, thr: &Array1<f64>) -> Array1<f64> {
    Zip::from(x)
        .and(thr)
        .map_collect(|&x, &t| x / (1.0 + 2.0 * t))
}

/// SCAD thresholding rule
///
/// Soft-thresholding for `|x| <= 2 thr`, the linear interpolation
/// `((a - 1) x - sign(x) a thr) / (a - 2)` up to `|x| = a thr`, and the identity beyond.
pub fn prox_scad(x: &Array1<f64>, thr: &Array1<f64>, a: f64) -> Array1<f64> {
    Zip::from(x).and(thr).map_collect(|&x, &t| {
        let upper = x.min(a * t) - (x + a * t).min(0.0);
        let soft = (x - t).max(0.0) - (-x - t).max(0.0);
        soft + ((upper - 2.0 * t).max(0.0) - (-upper - 2.0 * t).max(0.0)) / (a - 2.0)
    })
}

/// The SCAD potential, summed over coordinates
pub fn penalty_scad(x: &Array1<f64>, gamma: f64, a: f64) -> f64 {
    x.iter()
        .map(|&x| {
            let x = x.abs();
            if x <= gamma {
                gamma * x
            } else if x <= a * gamma {
                (2.0 * a * gamma * x - x * x - gamma * gamma) / (2.0 * (a - 1.0))
            } else {
                (a + 1.0) * gamma * gamma / 2.0
            }
        })
        .sum()
}
