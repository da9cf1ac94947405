use reweave_core::IpfIteration;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A progress record with a monotonic timestamp measured from the bus's
/// creation.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchEvent {
    pub at: Duration,
    pub kind: SearchEventKind,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SearchEventKind {
    SearchStarted {
        total_levels: usize,
        statistic_name: String,
    },
    SearchLevel {
        level: usize,
        total_levels: usize,
        total_evaluated: usize,
        loopless_count: usize,
        loop_count: usize,
        best_name: String,
        best_stat: f64,
        level_time: Duration,
        elapsed: Duration,
        avg_per_model: Duration,
    },
    IpfIteration(IpfIteration),
    ModelBatch {
        evaluated: usize,
        in_level: usize,
        total_evaluated: usize,
    },
    SearchComplete {
        total_evaluated: usize,
        best_name: String,
        best_stat: f64,
        elapsed: Duration,
    },
}

impl SearchEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchStarted { .. } => "search_started",
            Self::SearchLevel { .. } => "search_level",
            Self::IpfIteration(_) => "ipf_iteration",
            Self::ModelBatch { .. } => "model_batch",
            Self::SearchComplete { .. } => "search_complete",
        }
    }
}
