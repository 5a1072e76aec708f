//! Agent results and the shared context handed to agents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::TaskId;
use crate::role::AgentRole;
use crate::task::{Task, TaskKind};

/// Outcome of an agent processing one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub success: bool,
    /// Kind-specific structured output. `Null` on failure.
    pub data: serde_json::Value,
    /// Human-readable justification. Never used for control flow.
    pub reasoning: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
}

impl AgentResult {
    pub fn success(data: serde_json::Value, reasoning: impl Into<String>, confidence: f64) -> Self {
        Self {
            success: true,
            data,
            reasoning: reasoning.into(),
            confidence: clamp_confidence(confidence),
        }
    }

    /// A failed result with null data and zero confidence.
    pub fn failure(reasoning: impl Into<String>) -> Self {
        Self {
            success: false,
            data: serde_json::Value::Null,
            reasoning: reasoning.into(),
            confidence: 0.0,
        }
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Pointer to the most recently completed execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastExecution {
    pub task_id: TaskId,
    pub task_kind: TaskKind,
    pub agent_role: AgentRole,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

/// Compact view of one history record, as seen by agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentExecution {
    pub task_id: TaskId,
    pub task_kind: TaskKind,
    pub agent_role: AgentRole,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// `None` while the execution is still in flight.
    pub success: Option<bool>,
}

/// Cross-agent state attached to every dispatched task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedContext {
    pub last_execution: Option<LastExecution>,
    /// Oldest first.
    pub recent_executions: Vec<RecentExecution>,
    pub enriched_at: DateTime<Utc>,
}

/// The copy of a caller's task that an agent actually receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTask {
    pub task_id: TaskId,
    pub task: Task,
    pub shared_context: SharedContext,
}

impl EnrichedTask {
    /// Wrap a task with an empty shared context.
    pub fn standalone(task: Task) -> Self {
        Self {
            task_id: TaskId::generate(),
            task,
            shared_context: SharedContext {
                last_execution: None,
                recent_executions: Vec::new(),
                enriched_at: Utc::now(),
            },
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.task.kind()
    }
}
