//! Sparse estimation of phylogenetic branch lengths.
//!
//! Branch lengths are estimated by penalized maximum likelihood, with LASSO, ridge or
//! SCAD penalties solved by proximal gradient methods. Near-zero branches collapse to
//! exactly zero, which turns a fully resolved binary tree into a multifurcating one.
//!
//! The likelihood itself is supplied by the caller through the [model::Model] trait.

pub mod algorithms;
pub mod model;
pub mod routines {
    pub mod diagnostics;
    pub mod logger;
    pub mod optimization;
    pub mod output;
    pub mod proximal;
    pub mod settings;
}
pub mod structs;

pub mod prelude {
    pub use crate::algorithms::{fit, Algorithm};
    pub use crate::model::{check_gradient, Model};
    pub use crate::routines::diagnostics::{collapsible, count_zeros, detection};
    pub use crate::routines::logger::setup_log;
    pub use crate::routines::optimization::adaptive::{adaptive_lasso, AdaptiveResult, CycleSummary};
    pub use crate::routines::optimization::fista::fista;
    pub use crate::routines::optimization::ista::ista;
    pub use crate::routines::optimization::{SolverResult, Status};
    pub use crate::routines::output::PhyloResult;
    pub use crate::routines::proximal::{
        penalty_scad, prox_l1, prox_l2, prox_scad, Penalty, SCAD_A,
    };
    pub use crate::routines::settings::{Adaptive, PenaltyKind, Settings, Solver};
    pub use crate::structs::trace::ObjectiveTrace;
    pub use crate::structs::weights::PenaltyWeights;
}
