//! # Specialists
//!
//! Every crew member is a [`Specialist`] engine driving a role-specific
//! [`Playbook`]. The engine owns the descriptor and the shared client, logs,
//! and refuses task kinds outside its descriptor. The playbook holds the
//! business rules and any per-agent state.
//!
//! Playbooks turn upstream errors into canned fallback results. An `Err`
//! from [`Playbook::run`] is reserved for the agent's own failures.

mod analytics;
mod language;
mod learning_coach;
mod memory_keeper;
mod motivation;

pub use analytics::{AnalyticsExpert, LearningPattern, SessionAnalysis, SessionMetrics, Trend};
pub use language::{BilingualRatio, LanguageSpecialist, detect_language};
pub use learning_coach::LearningCoach;
pub use memory_keeper::{
    AdaptiveProfile, LearningStyle, LongTermMemory, MemoryKeeper, Milestone, PreferredDifficulty,
    SessionMemory, Significance,
};
pub use motivation::{CelebrationRecord, MotivationSpecialist};

use async_trait::async_trait;
use educrew_core::{Agent, AgentDescriptor, AgentResult, AgentRole, CrewResult, EnrichedTask};
use educrew_responder::RateLimitedClient;
use std::sync::Arc;
use tracing::{debug, warn};

/// Role-specific task handling.
#[async_trait]
pub trait Playbook: Send + Sync + 'static {
    const ROLE: AgentRole;

    async fn run(&self, client: &RateLimitedClient, task: &EnrichedTask)
    -> CrewResult<AgentResult>;
}

/// Generic agent engine.
pub struct Specialist<P> {
    descriptor: AgentDescriptor,
    client: Arc<RateLimitedClient>,
    playbook: P,
}

impl<P: Playbook> Specialist<P> {
    /// Create a specialist with the role's full descriptor.
    pub fn new(client: Arc<RateLimitedClient>, playbook: P) -> Self {
        Self {
            descriptor: AgentDescriptor::for_role(P::ROLE),
            client,
            playbook,
        }
    }

    /// Replace the descriptor, e.g. to serve a subset of the role's kinds.
    pub fn with_descriptor(mut self, descriptor: AgentDescriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    pub fn playbook(&self) -> &P {
        &self.playbook
    }
}

#[async_trait]
impl<P: Playbook> Agent for Specialist<P> {
    fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn process(&self, task: EnrichedTask) -> CrewResult<AgentResult> {
        let kind = task.kind();
        let role = self.descriptor.role;
        if !self.descriptor.can_handle(kind) {
            warn!(agent = %role, task_kind = %kind, "Task kind outside agent capabilities");
            return Ok(AgentResult::failure(format!(
                "{} cannot handle task type: {}",
                role, kind
            )));
        }

        debug!(agent = %role, task_id = %task.task_id, task_kind = %kind, "Processing task");
        self.playbook.run(&self.client, &task).await
    }
}

/// Result for a payload the playbook does not serve.
pub(crate) fn unsupported(role: AgentRole, task: &EnrichedTask) -> AgentResult {
    AgentResult::failure(format!("{} cannot handle task type: {}", role, task.kind()))
}
