//! # Agent
//!
//! The contract every specialist implements.

use async_trait::async_trait;

use crate::error::CrewResult;
use crate::result::{AgentResult, EnrichedTask};
use crate::role::{AgentDescriptor, AgentRole};
use crate::task::TaskKind;

/// A capability-bound worker that processes tasks of declared kinds.
///
/// Agents never touch the orchestrator's history or shared memory. They only
/// read the shared context attached to the task and return an
/// [`AgentResult`].
///
/// # Errors
///
/// Upstream failures are expected to be turned into fallback results inside
/// `process`. An `Err` means the agent itself failed and is reported by the
/// orchestrator as an internal error.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use educrew_core::{Agent, AgentDescriptor, AgentResult, AgentRole, CrewResult, EnrichedTask};
///
/// struct Cheerleader {
///     descriptor: AgentDescriptor,
/// }
///
/// #[async_trait]
/// impl Agent for Cheerleader {
///     fn descriptor(&self) -> &AgentDescriptor {
///         &self.descriptor
///     }
///
///     async fn process(&self, _task: EnrichedTask) -> CrewResult<AgentResult> {
///         Ok(AgentResult::success(serde_json::json!({ "message": "Yay!" }), "cheered", 1.0))
///     }
/// }
///
/// let agent = Cheerleader {
///     descriptor: AgentDescriptor::for_role(AgentRole::MotivationSpecialist),
/// };
/// assert_eq!(agent.role(), AgentRole::MotivationSpecialist);
/// ```
#[async_trait]
pub trait Agent: Send + Sync {
    /// Static identity of this agent.
    fn descriptor(&self) -> &AgentDescriptor;

    fn role(&self) -> AgentRole {
        self.descriptor().role
    }

    fn can_handle(&self, kind: TaskKind) -> bool {
        self.descriptor().can_handle(kind)
    }

    /// Process one task.
    async fn process(&self, task: EnrichedTask) -> CrewResult<AgentResult>;
}
