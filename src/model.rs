use ndarray::Array1;

/// The likelihood oracle consumed by the optimizers.
///
/// A [Model] evaluates the phylogenetic log-likelihood of a tree for a given vector
/// of branch lengths, and its gradient with respect to those branch lengths. How the
/// likelihood is computed (substitution model, conditional likelihood vectors, etc.)
/// is entirely up to the implementor.
///
/// The optimizers never mutate the model or the tree; they only pass candidate
/// branch vectors to it, so implementations must be safe to call repeatedly.
pub trait Model {
    /// The tree topology the likelihood is evaluated on
    type Tree;

    /// Log-likelihood of `tree` with the given branch lengths.
    ///
    /// Invalid or degenerate branch configurations must be reported as `-inf`
    /// (or a very negative value) rather than by panicking, as the accelerated
    /// solver restarts on non-finite values.
    fn loglikelihood(&self, tree: &Self::Tree, branches: &Array1<f64>) -> f64;

    /// Gradient of the log-likelihood with respect to each branch length,
    /// in the same order as `branches`.
    fn gradient(&self, tree: &Self::Tree, branches: &Array1<f64>) -> Array1<f64>;

    /// Number of tips (taxa) in the tree
    fn ntips(&self) -> usize;

    /// Number of edges of an unrooted binary tree with [Model::ntips] tips
    fn nbranches(&self) -> usize {
        (2 * self.ntips()).saturating_sub(3)
    }
}

/// Forward finite-difference approximation of the log-likelihood gradient.
///
/// Useful to validate a [Model::gradient] implementation; each coordinate is
/// perturbed by `db` in turn.
pub fn check_gradient<M: Model>(
    model: &M,
    tree: &M::Tree,
    branches: &Array1<f64>,
    db: f64,
) -> Array1<f64> {
    let base = model.loglikelihood(tree, branches);
    Array1::from_shape_fn(branches.len(), |i| {
        let mut shifted = branches.clone();
        shifted[i] += db;
        (model.loglikelihood(tree, &shifted) - base) / db
    })
}
