//! # Agent Registry
//!
//! Holds the crew's agents in registration order and picks one per task.
//!
//! ## Selection
//!
//! 1. Keep agents whose capabilities contain the task kind.
//! 2. Score each by its success rate on that kind. An agent that has never
//!    completed such a task scores 1.0.
//! 3. Agents scoring above the threshold qualify. Among qualified agents one
//!    that declares every required tool wins, else the first qualified.
//! 4. With nobody qualified, the first capable agent that declares the
//!    required tools wins, else the first capable agent.
//!
//! Ties always break by registration order.

use educrew_core::{
    Agent, AgentRole, CrewError, CrewResult, ProfileStore, TaskKind, ToolName,
};
use educrew_responder::RateLimitedClient;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use crate::history::TaskHistory;
use crate::specialists::{
    AnalyticsExpert, LanguageSpecialist, LearningCoach, MemoryKeeper, MotivationSpecialist,
    Specialist,
};

/// Immutable, validated set of agents.
#[derive(Clone)]
pub struct AgentRegistry {
    agents: Vec<Arc<dyn Agent>>,
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.agents.iter().map(|a| a.role()))
            .finish()
    }
}

impl AgentRegistry {
    /// Validate and freeze an agent set.
    ///
    /// # Errors
    ///
    /// Returns `CrewError::InvalidRegistry` when two agents share a role, an
    /// agent declares no capabilities, or an agent claims a task kind its
    /// role does not serve.
    pub fn new(agents: Vec<Arc<dyn Agent>>) -> CrewResult<Self> {
        let mut seen = HashSet::new();
        for agent in &agents {
            let descriptor = agent.descriptor();
            let role = descriptor.role;
            if !seen.insert(role) {
                return Err(CrewError::InvalidRegistry(format!(
                    "duplicate agent role: {}",
                    role
                )));
            }
            if descriptor.capabilities.is_empty() {
                return Err(CrewError::InvalidRegistry(format!(
                    "agent {} declares no capabilities",
                    role
                )));
            }
            if let Some(kind) = descriptor
                .capabilities
                .iter()
                .find(|kind| !role.capabilities().contains(kind))
            {
                return Err(CrewError::InvalidRegistry(format!(
                    "agent {} cannot serve {}",
                    role, kind
                )));
            }
        }
        Ok(Self { agents })
    }

    /// The five specialists, sharing one client and one profile store.
    pub fn standard(
        client: Arc<RateLimitedClient>,
        profiles: Arc<dyn ProfileStore>,
    ) -> CrewResult<Self> {
        Self::new(vec![
            Arc::new(Specialist::new(client.clone(), LearningCoach::default())),
            Arc::new(Specialist::new(client.clone(), MotivationSpecialist::default())),
            Arc::new(Specialist::new(client.clone(), AnalyticsExpert::default())),
            Arc::new(Specialist::new(client.clone(), LanguageSpecialist::default())),
            Arc::new(Specialist::new(client, MemoryKeeper::new(profiles))),
        ])
    }

    /// Agents in registration order.
    pub fn agents(&self) -> &[Arc<dyn Agent>] {
        &self.agents
    }

    pub fn get(&self, role: AgentRole) -> Option<&Arc<dyn Agent>> {
        self.agents.iter().find(|a| a.role() == role)
    }

    pub fn first_capable(&self, kind: TaskKind) -> Option<&Arc<dyn Agent>> {
        self.agents.iter().find(|a| a.can_handle(kind))
    }

    /// Pick the agent for a task of `kind`.
    pub fn select(
        &self,
        kind: TaskKind,
        required_tools: &BTreeSet<ToolName>,
        history: &TaskHistory,
        threshold: f64,
    ) -> CrewResult<Arc<dyn Agent>> {
        let candidates: Vec<&Arc<dyn Agent>> =
            self.agents.iter().filter(|a| a.can_handle(kind)).collect();
        if candidates.is_empty() {
            return Err(CrewError::NoSuitableAgent { kind });
        }

        let has_tools = |agent: &Arc<dyn Agent>| agent.descriptor().supports_tools(required_tools);
        let qualified: Vec<&Arc<dyn Agent>> = candidates
            .iter()
            .copied()
            .filter(|a| history.success_rate(a.role(), kind).unwrap_or(1.0) > threshold)
            .collect();

        let chosen = qualified
            .iter()
            .find(|a| has_tools(a))
            .or_else(|| qualified.first())
            .or_else(|| candidates.iter().find(|a| has_tools(a)))
            .or_else(|| candidates.first())
            .copied()
            .ok_or(CrewError::NoSuitableAgent { kind })?;
        Ok(Arc::clone(chosen))
    }
}
