#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Controls how much progress a search reports.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProgressConfig {
    pub enabled: bool,
    /// Emit a `ModelBatch` event once this many models have been
    /// evaluated since the last one.
    pub model_batch_size: usize,
    /// Forwarded to the IPF fitter as its progress interval.
    pub ipf_interval: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        ProgressConfig {
            enabled: true,
            model_batch_size: 100,
            ipf_interval: 20,
        }
    }
}
