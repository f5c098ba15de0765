use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatrixProviderError {
    #[error("{provider} provider unavailable: {reason}")]
    ProviderUnavailable {
        provider: &'static str,
        reason: String,
    },

    #[error("{provider} provider could not resolve {} of {total} location pairs", missing.len())]
    PartialCoverage {
        provider: &'static str,
        /// (origin, destination) pairs that could not be resolved
        missing: Vec<(usize, usize)>,
        total: usize,
    },

    #[error("{provider} provider did not answer within {timeout:?}")]
    Timeout {
        provider: &'static str,
        timeout: Duration,
    },

    #[error("invalid matrix request: {0}")]
    InvalidRequest(String),
}

impl MatrixProviderError {
    pub fn unavailable(provider: &'static str, reason: impl Into<String>) -> Self {
        MatrixProviderError::ProviderUnavailable {
            provider,
            reason: reason.into(),
        }
    }

    /// Transient failures are worth a retry, coverage and request errors are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            MatrixProviderError::ProviderUnavailable { .. } | MatrixProviderError::Timeout { .. }
        )
    }

    pub fn is_partial_coverage(&self) -> bool {
        matches!(self, MatrixProviderError::PartialCoverage { .. })
    }
}
