//! Agent roles and their static capability table.
//!
//! Which task kinds and tools a role may claim is fixed here, at compile
//! time. The registry checks every agent descriptor against this table when
//! it is built, so nothing needs to be re-checked per call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::task::{TaskKind, ToolName};

/// The closed set of specialist roles. Each role is unique within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    LearningCoach,
    MotivationSpecialist,
    AnalyticsExpert,
    LanguageSpecialist,
    MemoryKeeper,
}

impl AgentRole {
    /// Every role, in standard registration order.
    pub const ALL: [AgentRole; 5] = [
        AgentRole::LearningCoach,
        AgentRole::MotivationSpecialist,
        AgentRole::AnalyticsExpert,
        AgentRole::LanguageSpecialist,
        AgentRole::MemoryKeeper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::LearningCoach => "learning_coach",
            AgentRole::MotivationSpecialist => "motivation_specialist",
            AgentRole::AnalyticsExpert => "analytics_expert",
            AgentRole::LanguageSpecialist => "language_specialist",
            AgentRole::MemoryKeeper => "memory_keeper",
        }
    }

    pub fn goal(&self) -> &'static str {
        match self {
            AgentRole::LearningCoach => {
                "Optimize the learning experience by adapting difficulty and giving personalized educational guidance"
            }
            AgentRole::MotivationSpecialist => {
                "Keep the child motivated and engaged through celebrations and positive encouragement"
            }
            AgentRole::AnalyticsExpert => {
                "Analyze learning and performance patterns to tune the educational experience"
            }
            AgentRole::LanguageSpecialist => {
                "Handle bilingual communication and linguistic adaptation"
            }
            AgentRole::MemoryKeeper => {
                "Keep a durable memory of each child's learning and adapt to their history"
            }
        }
    }

    /// Task kinds this role may serve.
    pub fn capabilities(&self) -> &'static [TaskKind] {
        match self {
            AgentRole::LearningCoach => &[
                TaskKind::GenerateHint,
                TaskKind::AdaptDifficulty,
                TaskKind::ProvideFeedback,
                TaskKind::SuggestNextActivity,
            ],
            AgentRole::MotivationSpecialist => {
                &[TaskKind::CreateCelebration, TaskKind::ProvideFeedback]
            }
            AgentRole::AnalyticsExpert => &[TaskKind::AnalyzePerformance],
            AgentRole::LanguageSpecialist => &[TaskKind::ProvideFeedback],
            AgentRole::MemoryKeeper => &[TaskKind::UpdateMemory],
        }
    }

    /// External tools this role depends on.
    pub fn tools(&self) -> &'static [ToolName] {
        match self {
            AgentRole::LearningCoach => &[
                ToolName::AzureOpenai,
                ToolName::DifficultyAdapter,
                ToolName::PerformanceAnalyzer,
            ],
            AgentRole::MotivationSpecialist => &[
                ToolName::AzureOpenai,
                ToolName::TtsEngine,
                ToolName::CelebrationGenerator,
            ],
            AgentRole::AnalyticsExpert => &[ToolName::AzureOpenai, ToolName::PerformanceAnalyzer],
            AgentRole::LanguageSpecialist => &[
                ToolName::AzureOpenai,
                ToolName::TtsEngine,
                ToolName::LanguageDetector,
            ],
            AgentRole::MemoryKeeper => &[ToolName::AzureOpenai, ToolName::MemoryManager],
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentRole::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown agent role: {}", s))
    }
}

/// Static identity of an agent, created once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub role: AgentRole,
    /// Descriptive only.
    pub goal: String,
    pub capabilities: BTreeSet<TaskKind>,
    pub tools: BTreeSet<ToolName>,
}

impl AgentDescriptor {
    /// The full descriptor of `role` as given by the static table.
    pub fn for_role(role: AgentRole) -> Self {
        Self {
            role,
            goal: role.goal().to_string(),
            capabilities: role.capabilities().iter().copied().collect(),
            tools: role.tools().iter().copied().collect(),
        }
    }

    /// Narrow the served task kinds.
    pub fn with_capabilities(mut self, kinds: impl IntoIterator<Item = TaskKind>) -> Self {
        self.capabilities = kinds.into_iter().collect();
        self
    }

    /// Replace the declared tools.
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolName>) -> Self {
        self.tools = tools.into_iter().collect();
        self
    }

    pub fn can_handle(&self, kind: TaskKind) -> bool {
        self.capabilities.contains(&kind)
    }

    /// True when every tool in `required` is declared.
    pub fn supports_tools(&self, required: &BTreeSet<ToolName>) -> bool {
        required.is_subset(&self.tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_role_serves_prepare_celebration() {
        for role in AgentRole::ALL {
            assert!(!role.capabilities().contains(&TaskKind::PrepareCelebration));
        }
    }

    #[test]
    fn test_feedback_is_served_by_three_roles_in_order() {
        let roles: Vec<_> = AgentRole::ALL
            .into_iter()
            .filter(|r| r.capabilities().contains(&TaskKind::ProvideFeedback))
            .collect();
        assert_eq!(
            roles,
            vec![
                AgentRole::LearningCoach,
                AgentRole::MotivationSpecialist,
                AgentRole::LanguageSpecialist
            ]
        );
    }

    #[test]
    fn test_descriptor_tool_support() {
        let descriptor = AgentDescriptor::for_role(AgentRole::MotivationSpecialist);
        let wanted: BTreeSet<_> = [ToolName::TtsEngine].into_iter().collect();
        assert!(descriptor.supports_tools(&wanted));
        assert!(descriptor.supports_tools(&BTreeSet::new()));

        let missing: BTreeSet<_> = [ToolName::MemoryManager].into_iter().collect();
        assert!(!descriptor.supports_tools(&missing));
    }

    #[test]
    fn test_role_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AgentRole::MotivationSpecialist).unwrap(),
            "\"motivation_specialist\""
        );
        assert_eq!(
            "memory_keeper".parse::<AgentRole>().unwrap(),
            AgentRole::MemoryKeeper
        );
    }
}
