use std::time::Duration;

use thiserror::Error;

use crate::pipeline::PipelineState;

/// Errors surfaced by the humanizer pipeline and its rule tables.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HumanizeError {
    #[error("input text is empty")]
    EmptyInput,

    #[error("rate limit exceeded, retry in {}ms", .retry_after.as_millis())]
    RateLimited { retry_after: Duration },

    #[error("processing failed while {state}: {reason}")]
    Processing { state: PipelineState, reason: String },

    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern `{pattern}` has no replacement candidates")]
    EmptyCandidates { pattern: String },
}

pub type HumanizeResult<T> = Result<T, HumanizeError>;

impl HumanizeError {
    /// Whether the caller may retry the same input later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HumanizeError::RateLimited { .. })
    }
}
