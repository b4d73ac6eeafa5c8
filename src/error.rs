//! Error taxonomy for the detection / regime pipeline.
//!
//! Every failure here is a deterministic function of the input and parameters,
//! so none of these are ever retried.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegimeError {
    /// Bad threshold, window, state count, etc. Caller error.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Too few samples for the requested computation.
    #[error("insufficient data: need at least {required} samples, got {available}")]
    InsufficientData { required: usize, available: usize },

    /// Numerical breakdown while fitting a model (NaN/Inf likelihood or parameters).
    #[error("training failure: {0}")]
    TrainingFailure(String),

    /// Every threshold candidate failed (or none were supplied).
    #[error("no viable threshold among {candidates} candidate(s)")]
    NoViableThreshold { candidates: usize },
}

impl RegimeError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn insufficient(required: usize, available: usize) -> Self {
        Self::InsufficientData {
            required,
            available,
        }
    }
}

pub type RegimeResult<T> = std::result::Result<T, RegimeError>;
