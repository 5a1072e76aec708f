//! Task definitions.
//!
//! A [`Task`] is a typed unit of work. Its kind is never stored on its own:
//! it is derived from the [`TaskPayload`] variant, so a task can't claim one
//! kind while carrying parameters for another.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::payload::{
    ActivityRequest, CelebrationRequest, DifficultyRequest, FeedbackRequest, HintRequest,
    MemoryRequest, PerformanceRequest,
};

/// The closed set of task types the crew understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    GenerateHint,
    CreateCelebration,
    AnalyzePerformance,
    AdaptDifficulty,
    PrepareCelebration,
    ProvideFeedback,
    UpdateMemory,
    SuggestNextActivity,
}

impl TaskKind {
    /// Every task kind, in declaration order.
    pub const ALL: [TaskKind; 8] = [
        TaskKind::GenerateHint,
        TaskKind::CreateCelebration,
        TaskKind::AnalyzePerformance,
        TaskKind::AdaptDifficulty,
        TaskKind::PrepareCelebration,
        TaskKind::ProvideFeedback,
        TaskKind::UpdateMemory,
        TaskKind::SuggestNextActivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::GenerateHint => "generate_hint",
            TaskKind::CreateCelebration => "create_celebration",
            TaskKind::AnalyzePerformance => "analyze_performance",
            TaskKind::AdaptDifficulty => "adapt_difficulty",
            TaskKind::PrepareCelebration => "prepare_celebration",
            TaskKind::ProvideFeedback => "provide_feedback",
            TaskKind::UpdateMemory => "update_memory",
            TaskKind::SuggestNextActivity => "suggest_next_activity",
        }
    }

    /// Key under which shared memory keeps results of this kind.
    pub fn results_key(&self) -> String {
        format!("{}_results", self.as_str())
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown task kind: {}", s))
    }
}

/// Task priority. A failing `High` task stops a workflow.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        })
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

/// External capabilities an agent may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    AzureOpenai,
    TtsEngine,
    DifficultyAdapter,
    CelebrationGenerator,
    PerformanceAnalyzer,
    MemoryManager,
    LanguageDetector,
}

impl ToolName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::AzureOpenai => "azure_openai",
            ToolName::TtsEngine => "tts_engine",
            ToolName::DifficultyAdapter => "difficulty_adapter",
            ToolName::CelebrationGenerator => "celebration_generator",
            ToolName::PerformanceAnalyzer => "performance_analyzer",
            ToolName::MemoryManager => "memory_manager",
            ToolName::LanguageDetector => "language_detector",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language of generated text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

impl Language {
    /// The other supported language.
    pub fn other(&self) -> Language {
        match self {
            Language::Es => Language::En,
            Language::En => Language::Es,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
        }
    }
}

/// Kind-specific parameters of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum TaskPayload {
    GenerateHint(HintRequest),
    CreateCelebration(CelebrationRequest),
    AnalyzePerformance(PerformanceRequest),
    AdaptDifficulty(DifficultyRequest),
    PrepareCelebration(CelebrationRequest),
    ProvideFeedback(FeedbackRequest),
    UpdateMemory(MemoryRequest),
    SuggestNextActivity(ActivityRequest),
}

impl TaskPayload {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskPayload::GenerateHint(_) => TaskKind::GenerateHint,
            TaskPayload::CreateCelebration(_) => TaskKind::CreateCelebration,
            TaskPayload::AnalyzePerformance(_) => TaskKind::AnalyzePerformance,
            TaskPayload::AdaptDifficulty(_) => TaskKind::AdaptDifficulty,
            TaskPayload::PrepareCelebration(_) => TaskKind::PrepareCelebration,
            TaskPayload::ProvideFeedback(_) => TaskKind::ProvideFeedback,
            TaskPayload::UpdateMemory(_) => TaskKind::UpdateMemory,
            TaskPayload::SuggestNextActivity(_) => TaskKind::SuggestNextActivity,
        }
    }

    /// Build a payload with default parameters for `kind`.
    pub fn default_for(kind: TaskKind) -> Self {
        match kind {
            TaskKind::GenerateHint => TaskPayload::GenerateHint(HintRequest::default()),
            TaskKind::CreateCelebration => {
                TaskPayload::CreateCelebration(CelebrationRequest::default())
            }
            TaskKind::AnalyzePerformance => {
                TaskPayload::AnalyzePerformance(PerformanceRequest::default())
            }
            TaskKind::AdaptDifficulty => TaskPayload::AdaptDifficulty(DifficultyRequest::default()),
            TaskKind::PrepareCelebration => {
                TaskPayload::PrepareCelebration(CelebrationRequest::default())
            }
            TaskKind::ProvideFeedback => TaskPayload::ProvideFeedback(FeedbackRequest::default()),
            TaskKind::UpdateMemory => TaskPayload::UpdateMemory(MemoryRequest::default()),
            TaskKind::SuggestNextActivity => {
                TaskPayload::SuggestNextActivity(ActivityRequest::default())
            }
        }
    }

    /// The child the task is about, when the payload names one.
    pub fn child_id(&self) -> Option<&str> {
        match self {
            TaskPayload::AnalyzePerformance(req) => Some(&req.child_id),
            TaskPayload::ProvideFeedback(req) => Some(&req.child_id),
            TaskPayload::UpdateMemory(req) => Some(&req.child_id),
            _ => None,
        }
    }

    /// Parse kind-specific parameters given as JSON.
    pub fn from_params(kind: TaskKind, params: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(serde_json::json!({
            "kind": kind.as_str(),
            "params": params,
        }))
    }
}

/// A unit of work submitted to the crew.
///
/// Tasks are values: the orchestrator never mutates the caller's task and
/// hands agents an enriched copy instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub payload: TaskPayload,
    #[serde(default)]
    pub priority: Priority,
    /// Tools the chosen agent should support. A preference, not a filter.
    #[serde(default)]
    pub required_tools: BTreeSet<ToolName>,
    #[serde(default)]
    pub description: String,
}

impl Task {
    /// Create a medium-priority task.
    pub fn new(payload: TaskPayload) -> Self {
        Self {
            description: format!("{} task", payload.kind()),
            payload,
            priority: Priority::default(),
            required_tools: BTreeSet::new(),
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.payload.kind()
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_required_tools(mut self, tools: impl IntoIterator<Item = ToolName>) -> Self {
        self.required_tools = tools.into_iter().collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_derived_from_payload() {
        let task = Task::new(TaskPayload::CreateCelebration(CelebrationRequest {
            achievement: Some("streak_5".to_string()),
            ..Default::default()
        }));
        assert_eq!(task.kind(), TaskKind::CreateCelebration);
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn test_task_kind_round_trips_through_str() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.as_str().parse::<TaskKind>().unwrap(), kind);
        }
        assert!("launch_rocket".parse::<TaskKind>().is_err());
    }

    #[test]
    fn test_results_key() {
        assert_eq!(TaskKind::GenerateHint.results_key(), "generate_hint_results");
    }

    #[test]
    fn test_payload_from_partial_params_uses_defaults() {
        let payload = TaskPayload::from_params(
            TaskKind::CreateCelebration,
            serde_json::json!({ "achievement": "streak_5" }),
        )
        .unwrap();
        match payload {
            TaskPayload::CreateCelebration(req) => {
                assert_eq!(req.achievement.as_deref(), Some("streak_5"));
                assert_eq!(req.correct_answers, 1);
                assert_eq!(req.game_type, "colors");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_task_deserializes_with_defaults() {
        let task: Task = serde_json::from_value(serde_json::json!({
            "payload": { "kind": "adapt_difficulty", "params": { "accuracy": 0.9 } },
            "priority": "high"
        }))
        .unwrap();
        assert_eq!(task.kind(), TaskKind::AdaptDifficulty);
        assert_eq!(task.priority, Priority::High);
        assert!(task.required_tools.is_empty());
    }

    #[test]
    fn test_language_other() {
        assert_eq!(Language::Es.other(), Language::En);
        assert_eq!(Language::En.other(), Language::Es);
    }
}
