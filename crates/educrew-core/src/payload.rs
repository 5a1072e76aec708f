//! Kind-specific task parameters.
//!
//! Every request type deserializes from a partial JSON object; missing
//! fields fall back to the defaults a game screen would otherwise send.

use serde::{Deserialize, Serialize};

use crate::identifiers::TaskId;
use crate::role::AgentRole;
use crate::task::{Language, TaskKind};

fn default_child_id() -> String {
    "anonymous".to_string()
}

fn default_game_type() -> String {
    "colors".to_string()
}

/// Parameters for [`TaskKind::GenerateHint`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HintRequest {
    pub child_name: Option<String>,
    pub child_age: u8,
    pub concept: String,
    pub language: Language,
}

impl Default for HintRequest {
    fn default() -> Self {
        Self {
            child_name: None,
            child_age: 5,
            concept: default_game_type(),
            language: Language::default(),
        }
    }
}

/// Parameters for [`TaskKind::CreateCelebration`] and
/// [`TaskKind::PrepareCelebration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CelebrationRequest {
    /// Named achievement such as `streak_5`.
    pub achievement: Option<String>,
    pub correct_answers: u32,
    pub streak: u32,
    pub game_type: String,
    pub language: Language,
}

impl Default for CelebrationRequest {
    fn default() -> Self {
        Self {
            achievement: None,
            correct_answers: 1,
            streak: 0,
            game_type: default_game_type(),
            language: Language::default(),
        }
    }
}

/// One answer given by a child during a game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interaction {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// What was being practised, e.g. `red_color` or `circle_shape`.
    pub concept: String,
    pub successful: bool,
    pub response_time_ms: Option<u64>,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            timestamp_ms: 0,
            concept: "unknown".to_string(),
            successful: false,
            response_time_ms: None,
        }
    }
}

/// A game session as reported by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionData {
    pub interactions: Vec<Interaction>,
    pub duration_ms: u64,
    pub mood: Option<String>,
}

impl SessionData {
    /// Fraction of successful interactions, `None` for an empty session.
    pub fn accuracy(&self) -> Option<f64> {
        if self.interactions.is_empty() {
            return None;
        }
        let correct = self.interactions.iter().filter(|i| i.successful).count();
        Some(correct as f64 / self.interactions.len() as f64)
    }
}

/// Parameters for [`TaskKind::AnalyzePerformance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceRequest {
    pub child_id: String,
    pub game_type: String,
    pub session: SessionData,
}

impl Default for PerformanceRequest {
    fn default() -> Self {
        Self {
            child_id: default_child_id(),
            game_type: default_game_type(),
            session: SessionData::default(),
        }
    }
}

/// Parameters for [`TaskKind::AdaptDifficulty`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyRequest {
    /// Recent accuracy in `[0, 1]`; treated as 0.5 when absent.
    pub accuracy: Option<f64>,
}

/// Parameters for [`TaskKind::ProvideFeedback`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackRequest {
    pub child_id: String,
    pub is_correct: bool,
    pub incorrect_answers: u32,
    pub language: Language,
    /// Free text to render bilingually.
    pub text: Option<String>,
    /// `color_feedback` switches to the fixed color vocabulary.
    pub context: String,
    pub color_name: Option<String>,
    pub game_type: String,
}

impl Default for FeedbackRequest {
    fn default() -> Self {
        Self {
            child_id: default_child_id(),
            is_correct: true,
            incorrect_answers: 0,
            language: Language::default(),
            text: None,
            context: "general".to_string(),
            color_name: None,
            game_type: default_game_type(),
        }
    }
}

/// Parameters for [`TaskKind::SuggestNextActivity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityRequest {
    pub current_concept: String,
    /// Mastery in `[0, 1]`; treated as 0.5 when absent.
    pub mastery_level: Option<f64>,
}

impl Default for ActivityRequest {
    fn default() -> Self {
        Self {
            current_concept: default_game_type(),
            mastery_level: None,
        }
    }
}

/// A learning milestone reported alongside a memory update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestoneInput {
    pub concept: Option<String>,
    pub mastery_level: Option<f64>,
    pub context: Option<String>,
}

/// Summary of a completed crew execution, attached to synthetic memory
/// updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionNote {
    pub task_id: TaskId,
    pub task_kind: TaskKind,
    pub agent_role: AgentRole,
    pub success: bool,
    pub confidence: f64,
    pub data: serde_json::Value,
}

/// Parameters for [`TaskKind::UpdateMemory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryRequest {
    pub child_id: String,
    pub interaction_type: String,
    pub session: SessionData,
    pub new_milestones: Vec<MilestoneInput>,
    pub execution: Option<ExecutionNote>,
}

impl Default for MemoryRequest {
    fn default() -> Self {
        Self {
            child_id: default_child_id(),
            interaction_type: "game".to_string(),
            session: SessionData::default(),
            new_milestones: Vec::new(),
            execution: None,
        }
    }
}
