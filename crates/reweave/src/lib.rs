//! Reconstructability analysis for multivariate categorical data: fit
//! models of lower-order marginal constraints, derive their
//! information-theoretic statistics, and search the model lattice.

pub use reweave_core::*;
pub use reweave_engines::*;
pub use reweave_error::{Error, ErrorCode, Result};
