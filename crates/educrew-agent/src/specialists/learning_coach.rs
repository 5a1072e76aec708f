use async_trait::async_trait;
use educrew_core::{
    ActivityRequest, AgentResult, AgentRole, CrewResult, DifficultyRequest, EnrichedTask,
    FeedbackRequest, HintRequest, Language, TaskPayload,
};
use educrew_responder::RateLimitedClient;
use serde_json::json;
use tracing::warn;

use super::{Playbook, unsupported};

/// Hints, difficulty adaptation, quick feedback and activity suggestions.
#[derive(Debug, Default)]
pub struct LearningCoach;

#[async_trait]
impl Playbook for LearningCoach {
    const ROLE: AgentRole = AgentRole::LearningCoach;

    async fn run(
        &self,
        client: &RateLimitedClient,
        task: &EnrichedTask,
    ) -> CrewResult<AgentResult> {
        Ok(match &task.task.payload {
            TaskPayload::GenerateHint(req) => generate_hint(client, req).await,
            TaskPayload::AdaptDifficulty(req) => adapt_difficulty(req),
            TaskPayload::ProvideFeedback(req) => feedback(req),
            TaskPayload::SuggestNextActivity(req) => suggest_activity(req),
            _ => unsupported(Self::ROLE, task),
        })
    }
}

async fn generate_hint(client: &RateLimitedClient, req: &HintRequest) -> AgentResult {
    let context = match req.language {
        Language::Es => format!(
            "Ayuda al niño a entender {}. Da una pista simple y divertida.",
            req.concept
        ),
        Language::En => format!(
            "Help the child understand {}. Give a simple and fun hint.",
            req.concept
        ),
    };

    match client
        .generate_for_child(req.child_name.as_deref(), req.child_age, &context, req.language)
        .await
    {
        Ok(message) => AgentResult::success(
            json!({
                "type": "hint",
                "message": message,
                "concept": req.concept,
                "difficulty": "adaptive",
            }),
            format!("Generated hint for {} concept", req.concept),
            0.8,
        ),
        Err(err) => {
            warn!(error = %err, concept = %req.concept, "Hint generation failed, using fallback");
            let message = match req.language {
                Language::Es => "¡Mira bien los colores! 🌈",
                Language::En => "Look carefully at the colors! 🌈",
            };
            AgentResult::success(
                json!({
                    "type": "hint",
                    "message": message,
                    "concept": req.concept,
                    "difficulty": "basic",
                }),
                "Fallback hint due to upstream error",
                0.6,
            )
        }
    }
}

fn adapt_difficulty(req: &DifficultyRequest) -> AgentResult {
    let accuracy = req.accuracy.unwrap_or(0.5);
    let new_difficulty = if accuracy > 0.8 {
        "hard"
    } else if accuracy < 0.4 {
        "easy"
    } else {
        "medium"
    };

    AgentResult::success(
        json!({
            "type": "difficulty_adaptation",
            "new_difficulty": new_difficulty,
            "reason": format!("Adjusted based on {:.1}% accuracy", accuracy * 100.0),
            "adjustment_type": "performance_based",
        }),
        "Difficulty adapted from performance data",
        0.9,
    )
}

fn feedback(req: &FeedbackRequest) -> AgentResult {
    let message = match (req.is_correct, req.language) {
        (true, Language::Es) => "¡Muy bien! 🎉",
        (true, Language::En) => "Great job! 🎉",
        (false, Language::Es) => "¡Inténtalo otra vez! 💪",
        (false, Language::En) => "Try again! 💪",
    };

    AgentResult::success(
        json!({
            "type": "feedback",
            "message": message,
            "is_positive": req.is_correct,
        }),
        format!(
            "Provided {} feedback",
            if req.is_correct { "positive" } else { "encouraging" }
        ),
        1.0,
    )
}

fn suggest_activity(req: &ActivityRequest) -> AgentResult {
    let mastery = req.mastery_level.unwrap_or(0.5);
    let (suggestion, next_concept) = if mastery > 0.8 {
        ("advance_to_shapes", "shapes")
    } else if mastery < 0.3 {
        ("review_basics", req.current_concept.as_str())
    } else {
        ("continue_practice", req.current_concept.as_str())
    };

    AgentResult::success(
        json!({
            "type": "activity_suggestion",
            "suggestion": suggestion,
            "next_concept": next_concept,
            "reasoning": format!("Based on {:.1}% mastery", mastery * 100.0),
        }),
        "Suggested next activity based on mastery level",
        0.8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use educrew_core::Task;
    use educrew_responder::{ResponderError, RetryPolicy};
    use educrew_testing::ScriptedResponder;
    use rstest::rstest;
    use std::sync::Arc;

    fn client(responder: ScriptedResponder) -> RateLimitedClient {
        RateLimitedClient::new(Arc::new(responder), RetryPolicy::default())
    }

    fn task(payload: TaskPayload) -> EnrichedTask {
        EnrichedTask::standalone(Task::new(payload))
    }

    #[tokio::test]
    async fn test_hint_uses_upstream_text() {
        let responder = ScriptedResponder::new().reply("Busca algo rojo como una manzana 🍎");
        let client = client(responder.clone());
        let result = LearningCoach
            .run(
                &client,
                &task(TaskPayload::GenerateHint(HintRequest {
                    concept: "red".to_string(),
                    ..Default::default()
                })),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.data["message"], "Busca algo rojo como una manzana 🍎");
        assert_eq!(result.data["difficulty"], "adaptive");
        assert!(responder.prompts()[0].contains("Ayuda al niño a entender red"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hint_falls_back_when_upstream_fails() {
        let responder = ScriptedResponder::new().fail_always(ResponderError::failed("down"));
        let result = LearningCoach
            .run(
                &client(responder),
                &task(TaskPayload::GenerateHint(HintRequest {
                    language: Language::En,
                    ..Default::default()
                })),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.confidence, 0.6);
        assert_eq!(result.data["message"], "Look carefully at the colors! 🌈");
        assert_eq!(result.data["difficulty"], "basic");
    }

    #[rstest]
    #[case(Some(0.95), "hard")]
    #[case(Some(0.8), "medium")]
    #[case(Some(0.39), "easy")]
    #[case(None, "medium")]
    fn test_adapt_difficulty(#[case] accuracy: Option<f64>, #[case] expected: &str) {
        let result = adapt_difficulty(&DifficultyRequest { accuracy });
        assert_eq!(result.data["new_difficulty"], expected);
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_run_routes_on_payload() {
        let client = client(ScriptedResponder::new());
        let result = tokio_test::block_on(LearningCoach.run(
            &client,
            &task(TaskPayload::AdaptDifficulty(DifficultyRequest {
                accuracy: Some(0.2),
            })),
        ))
        .unwrap();
        assert_eq!(result.data["new_difficulty"], "easy");
        assert_eq!(result.data["adjustment_type"], "performance_based");
    }

    #[test]
    fn test_reason_formats_percentage() {
        let result = adapt_difficulty(&DifficultyRequest {
            accuracy: Some(0.875),
        });
        assert_eq!(result.data["reason"], "Adjusted based on 87.5% accuracy");
    }

    #[rstest]
    #[case(true, Language::Es, "¡Muy bien! 🎉")]
    #[case(false, Language::En, "Try again! 💪")]
    fn test_feedback(#[case] is_correct: bool, #[case] language: Language, #[case] message: &str) {
        let result = feedback(&FeedbackRequest {
            is_correct,
            language,
            ..Default::default()
        });
        assert_eq!(result.data["message"], message);
        assert_eq!(result.data["is_positive"], is_correct);
        assert_eq!(result.confidence, 1.0);
    }

    #[rstest]
    #[case(Some(0.9), "advance_to_shapes", "shapes")]
    #[case(Some(0.2), "review_basics", "colors")]
    #[case(None, "continue_practice", "colors")]
    fn test_suggest_activity(
        #[case] mastery_level: Option<f64>,
        #[case] suggestion: &str,
        #[case] next: &str,
    ) {
        let result = suggest_activity(&ActivityRequest {
            mastery_level,
            ..Default::default()
        });
        assert_eq!(result.data["suggestion"], suggestion);
        assert_eq!(result.data["next_concept"], next);
    }
}
