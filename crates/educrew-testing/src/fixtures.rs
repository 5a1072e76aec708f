//! Ready-made tasks for tests.

use educrew_core::{
    CelebrationRequest, FeedbackRequest, HintRequest, Interaction, MemoryRequest,
    PerformanceRequest, SessionData, Task, TaskPayload,
};

/// Hint request for a five-year-old about `concept`.
pub fn hint_task(concept: &str) -> Task {
    Task::new(TaskPayload::GenerateHint(HintRequest {
        concept: concept.to_string(),
        ..Default::default()
    }))
}

/// Celebration of a named achievement.
pub fn celebration_task(achievement: &str) -> Task {
    Task::new(TaskPayload::CreateCelebration(CelebrationRequest {
        achievement: Some(achievement.to_string()),
        correct_answers: 5,
        streak: 5,
        ..Default::default()
    }))
}

/// Feedback on one answer.
pub fn feedback_task(child_id: &str, is_correct: bool) -> Task {
    Task::new(TaskPayload::ProvideFeedback(FeedbackRequest {
        child_id: child_id.to_string(),
        is_correct,
        incorrect_answers: u32::from(!is_correct),
        ..Default::default()
    }))
}

/// `correct` right answers followed by `wrong` wrong ones on `concept`,
/// three seconds apart.
pub fn session(concept: &str, correct: usize, wrong: usize) -> SessionData {
    let interactions: Vec<Interaction> = (0..correct + wrong)
        .map(|i| Interaction {
            timestamp_ms: 1_700_000_000_000 + i as i64 * 3_000,
            concept: concept.to_string(),
            successful: i < correct,
            response_time_ms: Some(2_500),
        })
        .collect();
    SessionData {
        duration_ms: interactions.len() as u64 * 3_000,
        interactions,
        mood: None,
    }
}

/// Performance analysis of one session.
pub fn performance_task(child_id: &str, correct: usize, wrong: usize) -> Task {
    Task::new(TaskPayload::AnalyzePerformance(PerformanceRequest {
        child_id: child_id.to_string(),
        session: session("rojo", correct, wrong),
        ..Default::default()
    }))
}

/// Memory update for one session.
pub fn memory_task(child_id: &str, correct: usize, wrong: usize) -> Task {
    Task::new(TaskPayload::UpdateMemory(MemoryRequest {
        child_id: child_id.to_string(),
        session: session("rojo", correct, wrong),
        ..Default::default()
    }))
}
