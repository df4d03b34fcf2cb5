//! Sparsity diagnostics for estimated branch lengths

use ndarray::Array1;
use std::collections::BTreeSet;

/// Number of branches estimated as exactly zero
pub fn count_zeros(branches: &Array1<f64>) -> usize {
    branches.iter().filter(|b| **b == 0.0).count()
}

/// Compare the estimated zero branches against the indices of the true zero branches.
///
/// Returns `(missed, false_alarms)`: `missed` counts true zero branches that were not
/// estimated as zero, `false_alarms` counts branches estimated as zero that are not
/// among the true zeros. Repeated indices are counted once.
pub fn detection(zero_idx: &[usize], estimate: &Array1<f64>) -> (usize, usize) {
    let zero_idx: BTreeSet<usize> = zero_idx.iter().copied().collect();
    let hits = zero_idx
        .iter()
        .filter(|&&i| estimate.get(i).map_or(false, |b| *b == 0.0))
        .count();
    let missed = zero_idx.len() - hits;
    let false_alarms = count_zeros(estimate) - hits;
    (missed, false_alarms)
}

/// Indices of the branches at or below `threshold`, i.e. the edges to collapse into
/// multifurcations
pub fn collapsible(branches: &Array1<f64>, threshold: f64) -> Vec<usize> {
    branches
        .iter()
        .enumerate()
        .filter(|(_, b)| **b <= threshold)
        .map(|(i, _)| i)
        .collect()
}
