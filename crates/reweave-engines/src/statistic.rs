use reweave_core::FitResult;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The statistic a search optimizes. ΔDF is maximized; AIC and BIC are
/// minimized.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SearchStatistic {
    Ddf,
    Aic,
    Bic,
}

impl SearchStatistic {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ddf => "ddf",
            Self::Aic => "aic",
            Self::Bic => "bic",
        }
    }

    pub fn value(&self, result: &FitResult) -> f64 {
        match self {
            Self::Ddf => result.ddf,
            Self::Aic => result.aic,
            Self::Bic => result.bic,
        }
    }

    /// Best-first ordering between two statistic values.
    pub fn compare(&self, a: f64, b: f64) -> Ordering {
        match self {
            Self::Ddf => b.total_cmp(&a),
            Self::Aic | Self::Bic => a.total_cmp(&b),
        }
    }

    /// Whether `a` is a strictly better value than `b`.
    pub fn improves(&self, a: f64, b: f64) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}
