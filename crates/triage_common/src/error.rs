//! Error types for the reasoning boundary.

use thiserror::Error;

/// Failures of the external reasoning call.
///
/// All three kinds route to the fallback engine; the distinction exists for
/// diagnostics, not for routing.
#[derive(Debug, Clone, Error)]
pub enum ReasoningError {
    /// No credential configured or reasoning disabled. Detected before any
    /// network activity.
    #[error("reasoning unavailable: {0}")]
    Unavailable(String),

    /// Transport or service failure, including per-call timeout expiry.
    #[error("reasoning request failed: {0}")]
    Request(String),

    /// The service answered, but not with valid JSON matching the decision
    /// shape. Never silently coerced.
    #[error("reasoning response malformed: {0}")]
    Parse(String),
}

impl ReasoningError {
    /// Short classifier label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Request(_) => "request",
            Self::Parse(_) => "parse",
        }
    }
}
