pub mod bp;
pub mod ipf;

use crate::table::Table;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One IPF iteration, as reported to a progress sink. Iteration events may
/// fire from worker threads during a parallel search, so sinks must be
/// `Send + Sync`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IpfIteration {
    pub model_name: String,
    pub iteration: usize,
    pub max_iterations: usize,
    pub error: f64,
    pub state_count: usize,
    pub relation_count: usize,
    pub converged: bool,
}

pub type IpfSink = Arc<dyn Fn(&IpfIteration) + Send + Sync>;

/// Configuration for the IPF fitter.
#[derive(Clone)]
pub struct IpfConfig {
    pub max_iterations: usize,
    pub convergence_threshold: f64,
    pub progress_interval: usize,
    pub raise_on_nonconvergence: bool,
    pub progress: Option<IpfSink>,
}

impl Default for IpfConfig {
    fn default() -> Self {
        IpfConfig {
            max_iterations: 266,
            convergence_threshold: 1e-7,
            progress_interval: 20,
            raise_on_nonconvergence: false,
            progress: None,
        }
    }
}

impl std::fmt::Debug for IpfConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpfConfig")
            .field("max_iterations", &self.max_iterations)
            .field("convergence_threshold", &self.convergence_threshold)
            .field("progress_interval", &self.progress_interval)
            .field("raise_on_nonconvergence", &self.raise_on_nonconvergence)
            .field("progress", &self.progress.as_ref().map(|_| "sink"))
            .finish()
    }
}

/// Configuration for the belief-propagation fitter.
#[derive(Clone, Debug)]
pub struct BpConfig {
    pub normalize: bool,
    pub strict: bool,
}

impl Default for BpConfig {
    fn default() -> Self {
        BpConfig {
            normalize: true,
            strict: false,
        }
    }
}

/// The fitted joint together with the fitter's trajectory. Belief
/// propagation is exact in one collect + distribute sweep, so it reports
/// zero iterations and zero error.
#[derive(Clone, Debug)]
pub struct FitOutcome {
    pub joint: Table,
    pub iterations: usize,
    pub error: f64,
    pub converged: bool,
}

/// Statistics derived from fitting one model. See the manager for how the
/// fields are computed.
#[derive(Clone, Debug)]
pub struct FitResult {
    pub model_name: String,
    /// Entropy of the fitted joint, in bits.
    pub h: f64,
    /// Transmission (KL divergence) from the observed distribution to the
    /// fitted one, in bits.
    pub t: f64,
    pub df: f64,
    /// `df_saturated - df`.
    pub ddf: f64,
    /// Likelihood ratio G².
    pub lr: f64,
    /// Pearson chi-square.
    pub pearson: f64,
    /// Upper-tail p-value of LR at `ddf` degrees of freedom.
    pub alpha: f64,
    pub aic: f64,
    pub bic: f64,
    /// Normalized information `1 - T / T(bottom)`.
    pub information: f64,
    pub has_loops: bool,
    pub ipf_iterations: usize,
    pub ipf_error: f64,
    /// `p(DV | IVs)` from the fitted joint, for directed systems.
    pub dv_conditional: Option<Table>,
    /// Observed-vs-predicted DV mass, `[observed][predicted]`, where the
    /// prediction is the modal DV state of the fitted conditional in each
    /// IV context. Directed systems only.
    pub dv_confusion: Option<Vec<Vec<f64>>>,
}
