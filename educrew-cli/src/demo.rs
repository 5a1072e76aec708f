//! Sample game session used by `educrew demo`.

use educrew_core::{
    ActivityRequest, CelebrationRequest, DifficultyRequest, FeedbackRequest, HintRequest,
    Interaction, MemoryRequest, MilestoneInput, PerformanceRequest, Priority, SessionData, Task,
    TaskPayload,
};

const CHILD: &str = "demo-child";

fn session() -> SessionData {
    let answers = [
        ("rojo", true),
        ("azul", false),
        ("rojo", true),
        ("verde", true),
        ("azul", true),
        ("rojo", true),
    ];
    let interactions: Vec<Interaction> = answers
        .iter()
        .enumerate()
        .map(|(i, (concept, successful))| Interaction {
            timestamp_ms: 1_700_000_000_000 + i as i64 * 4_000,
            concept: (*concept).to_string(),
            successful: *successful,
            response_time_ms: Some(2_000 + i as u64 * 150),
        })
        .collect();
    SessionData {
        duration_ms: interactions.len() as u64 * 4_000,
        interactions,
        mood: Some("happy".to_string()),
    }
}

/// One task per crew member, in the order a colors game would issue them.
pub fn session_tasks() -> Vec<Task> {
    vec![
        Task::new(TaskPayload::GenerateHint(HintRequest {
            child_name: Some("Sofía".to_string()),
            concept: "rojo".to_string(),
            ..Default::default()
        }))
        .with_priority(Priority::High),
        Task::new(TaskPayload::ProvideFeedback(FeedbackRequest {
            child_id: CHILD.to_string(),
            context: "color_feedback".to_string(),
            color_name: Some("red".to_string()),
            ..Default::default()
        })),
        Task::new(TaskPayload::CreateCelebration(CelebrationRequest {
            achievement: Some("streak_5".to_string()),
            correct_answers: 5,
            streak: 5,
            ..Default::default()
        })),
        Task::new(TaskPayload::AnalyzePerformance(PerformanceRequest {
            child_id: CHILD.to_string(),
            session: session(),
            ..Default::default()
        })),
        Task::new(TaskPayload::AdaptDifficulty(DifficultyRequest {
            accuracy: session().accuracy(),
        })),
        Task::new(TaskPayload::SuggestNextActivity(ActivityRequest {
            current_concept: "colors".to_string(),
            mastery_level: Some(0.85),
        })),
        Task::new(TaskPayload::UpdateMemory(MemoryRequest {
            child_id: CHILD.to_string(),
            session: session(),
            new_milestones: vec![MilestoneInput {
                concept: Some("rojo".to_string()),
                mastery_level: Some(0.9),
                context: Some("colors game".to_string()),
            }],
            ..Default::default()
        }))
        .with_priority(Priority::Low),
    ]
}
