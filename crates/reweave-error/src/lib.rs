use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [Error], independent of its payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    Validation,
    JunctionTree,
    Convergence,
    Computation,
    Internal,
}

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// User-supplied input failed validation: unknown abbreviation,
    /// malformed model string, cardinality out of range, duplicate
    /// variable, row length mismatch.
    #[error("validation error: {0}")]
    Validation(String),

    /// The running intersection property did not hold for a model the
    /// caller asserted was decomposable.
    #[error("junction tree error: {0}")]
    JunctionTree(String),

    /// IPF ran out of its iteration budget with strict mode enabled.
    #[error(
        "ipf did not converge after {iterations} iterations \
         (threshold {threshold:e}, final error {final_error:e})"
    )]
    Convergence {
        iterations: usize,
        threshold: f64,
        final_error: f64,
    },

    /// NaN/Inf in a potential, or division by zero in strict mode.
    #[error("computation error: {0}")]
    Computation(String),

    /// A broken internal invariant. These are bugs, not user errors.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::JunctionTree(_) => ErrorCode::JunctionTree,
            Self::Convergence { .. } => ErrorCode::Convergence,
            Self::Computation(_) => ErrorCode::Computation,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn computation(msg: impl Into<String>) -> Self {
        Self::Computation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_variants() {
        assert_eq!(
            Error::validation("bad token").code(),
            ErrorCode::Validation
        );
        assert_eq!(
            Error::Convergence {
                iterations: 50,
                threshold: 1e-7,
                final_error: 3e-4,
            }
            .code(),
            ErrorCode::Convergence
        );
    }

    #[test]
    fn convergence_message_carries_context() {
        let err = Error::Convergence {
            iterations: 266,
            threshold: 1e-7,
            final_error: 2.5e-4,
        };
        let msg = err.to_string();
        assert!(msg.contains("266"));
        assert!(msg.contains("e-7"));
    }
}
