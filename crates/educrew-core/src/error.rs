//! Error types for the agent crew.

use thiserror::Error;

use crate::task::TaskKind;

/// Errors that can occur while dispatching and executing crew tasks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrewError {
    /// No registered agent declares the task kind.
    #[error("No suitable agent found for task type: {kind}")]
    NoSuitableAgent { kind: TaskKind },

    /// The agent did not finish within the time budget.
    #[error("Task {task_id} timed out after {timeout_ms}ms")]
    TaskTimeout { task_id: String, timeout_ms: u64 },

    /// The upstream responder kept rate-limiting past the retry budget.
    #[error("Upstream responder throttled after {attempts} attempts")]
    UpstreamThrottled { attempts: u32 },

    /// The upstream responder failed for a reason other than throttling.
    #[error("Upstream responder failed after {attempts} attempts: {reason}")]
    UpstreamFailure { attempts: u32, reason: String },

    /// Agent logic raised unexpectedly.
    #[error("Agent internal error: {0}")]
    AgentInternalError(String),

    /// The agent set handed to the registry is inconsistent.
    #[error("Invalid agent registry: {0}")]
    InvalidRegistry(String),

    /// Profile store read or write failed.
    #[error("Profile store error: {0}")]
    ProfileStore(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CrewError {
    /// Check if retrying the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CrewError::UpstreamThrottled { .. }
                | CrewError::UpstreamFailure { .. }
                | CrewError::TaskTimeout { .. }
        )
    }

    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            CrewError::NoSuitableAgent { .. } => "NO_SUITABLE_AGENT",
            CrewError::TaskTimeout { .. } => "TASK_TIMEOUT",
            CrewError::UpstreamThrottled { .. } => "UPSTREAM_THROTTLED",
            CrewError::UpstreamFailure { .. } => "UPSTREAM_FAILURE",
            CrewError::AgentInternalError(_) => "AGENT_INTERNAL_ERROR",
            CrewError::InvalidRegistry(_) => "INVALID_REGISTRY",
            CrewError::ProfileStore(_) => "PROFILE_STORE_ERROR",
            CrewError::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// Result type for crew operations.
pub type CrewResult<T> = Result<T, CrewError>;

impl From<serde_json::Error> for CrewError {
    fn from(err: serde_json::Error) -> Self {
        CrewError::AgentInternalError(format!("Serialization error: {}", err))
    }
}
