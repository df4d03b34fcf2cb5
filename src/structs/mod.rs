pub mod trace;
pub mod weights;
