use ndarray::Array1;
use ndarray_stats::SummaryStatisticsExt;
use std::ops::Index;

/// Machine epsilon, keeps weights finite for branches that are exactly zero
pub const EPS: f64 = f64::EPSILON;

/// Per-branch multipliers of the penalty strength.
///
/// This is a thin wrapper around [ndarray::Array1<f64>]. Weights are strictly positive;
/// the adaptive scheduler derives them from a previous solution so that short branches
/// are penalized more heavily in the next cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PenaltyWeights {
    weights: Array1<f64>,
}

impl PenaltyWeights {
    /// Uniform weights of one for `n` branches
    pub fn uniform(n: usize) -> Self {
        Self {
            weights: Array1::ones(n),
        }
    }

    /// Adaptive weights `1 / (x + eps)^p` from a previous branch length solution
    pub fn adaptive(branches: &Array1<f64>, exponent: f64) -> Self {
        Self {
            weights: branches.mapv(|b| 1.0 / (b + EPS).powf(exponent)),
        }
    }

    /// Create a new [PenaltyWeights] instance from a vector of weights.
    pub fn from_vec(weights: Vec<f64>) -> Self {
        Self {
            weights: Array1::from(weights),
        }
    }

    /// Get a reference to the weights.
    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Get the number of weights.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Multiply every weight by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            weights: &self.weights * factor,
        }
    }

    /// Harmonic mean of the weights, used to keep the penalty strength comparable
    /// across adaptive cycles.
    ///
    /// Returns `None` for an empty vector.
    pub fn harmonic_mean(&self) -> Option<f64> {
        self.weights.harmonic_mean().ok()
    }

    /// Whether every weight is a strictly positive finite number
    pub fn is_valid(&self) -> bool {
        self.weights.iter().all(|w| w.is_finite() && *w > 0.0)
    }
}

impl Index<usize> for PenaltyWeights {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.weights[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn uniform_weights_have_unit_harmonic_mean() {
        let w = PenaltyWeights::uniform(7);
        assert_eq!(w.len(), 7);
        assert!((w.harmonic_mean().unwrap() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn adaptive_weights_are_inverse_branch_lengths() {
        let w = PenaltyWeights::adaptive(&array![0.5, 0.25, 0.0], 1.0);
        assert!((w[0] - 2.0).abs() < 1e-12);
        assert!((w[1] - 4.0).abs() < 1e-12);
        assert!((w[2] - 1.0 / EPS).abs() < 1.0);
        assert!(w.is_valid());
    }

    #[test]
    fn adaptive_weights_respect_exponent() {
        let w = PenaltyWeights::adaptive(&array![0.5], 2.0);
        assert!((w[0] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn harmonic_mean_of_adaptive_weights_is_inverse_mean_branch() {
        let branches = array![0.1, 0.3, 0.2];
        let w = PenaltyWeights::adaptive(&branches, 1.0);
        let expected = 1.0 / branches.mean().unwrap();
        assert!((w.harmonic_mean().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_weights_have_no_harmonic_mean() {
        assert!(PenaltyWeights::from_vec(vec![]).harmonic_mean().is_none());
    }

    #[test]
    fn invalid_weights_are_detected() {
        assert!(!PenaltyWeights::from_vec(vec![1.0, 0.0]).is_valid());
        assert!(!PenaltyWeights::from_vec(vec![f64::INFINITY]).is_valid());
        assert!(PenaltyWeights::uniform(3).scaled(2.5).is_valid());
    }
}
