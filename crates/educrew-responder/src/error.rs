//! Responder error types.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single upstream generation call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResponderError {
    /// The upstream explicitly rate-limited the call (HTTP 429).
    #[error("Upstream rate limit exceeded")]
    Throttled {
        /// Server-suggested wait, when one was given.
        retry_after: Option<Duration>,
    },

    /// Any other failure: transport, status, malformed or empty response.
    #[error("Upstream call failed: {0}")]
    Failed(String),
}

impl ResponderError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ResponderError::Failed(reason.into())
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, ResponderError::Throttled { .. })
    }
}

impl From<reqwest::Error> for ResponderError {
    fn from(err: reqwest::Error) -> Self {
        ResponderError::Failed(format!("HTTP error: {}", err))
    }
}
