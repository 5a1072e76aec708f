use async_trait::async_trait;
use chrono::{DateTime, Utc};
use educrew_core::{
    AgentResult, AgentRole, CrewResult, EnrichedTask, Interaction, Language, PerformanceRequest,
    TaskPayload,
};
use educrew_responder::RateLimitedClient;
use serde::Serialize;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::warn;

use super::{Playbook, unsupported};

const SESSION_ANALYSES: usize = 50;
const TREND_WINDOW: usize = 3;
const TREND_MARGIN: f64 = 0.2;

/// Aggregate numbers for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionMetrics {
    pub accuracy: f64,
    pub average_response_time_ms: f64,
    pub total_attempts: usize,
    pub correct_answers: usize,
    pub incorrect_answers: usize,
    /// Successes at the end of the session.
    pub streak: usize,
    pub max_streak: usize,
}

impl SessionMetrics {
    pub fn from_interactions(interactions: &[Interaction]) -> Self {
        if interactions.is_empty() {
            return Self::default();
        }

        let total_attempts = interactions.len();
        let correct_answers = interactions.iter().filter(|i| i.successful).count();
        let response_times: Vec<u64> = interactions
            .iter()
            .filter_map(|i| i.response_time_ms)
            .filter(|t| *t > 0)
            .collect();
        let average_response_time_ms = if response_times.is_empty() {
            0.0
        } else {
            response_times.iter().map(|&t| t as f64).sum::<f64>() / response_times.len() as f64
        };

        let mut run = 0;
        let mut max_streak = 0;
        for interaction in interactions {
            if interaction.successful {
                run += 1;
                max_streak = max_streak.max(run);
            } else {
                run = 0;
            }
        }
        let streak = interactions
            .iter()
            .rev()
            .take_while(|i| i.successful)
            .count();

        Self {
            accuracy: correct_answers as f64 / total_attempts as f64,
            average_response_time_ms,
            total_attempts,
            correct_answers,
            incorrect_answers: total_attempts - correct_answers,
            streak,
            max_streak,
        }
    }

    /// More data gives more confidence. Mid-range accuracy is ambiguous.
    fn confidence(&self) -> f64 {
        let mut confidence = (self.total_attempts as f64 / 10.0).min(1.0);
        if self.accuracy > 0.2 && self.accuracy < 0.8 {
            confidence *= 0.9;
        }
        confidence.max(0.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

/// Progress on one concept within a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningPattern {
    pub concept: String,
    pub mastery_level: f64,
    /// Accuracy per minute of practice.
    pub progress_rate: f64,
    pub trend: Trend,
    pub recommended_next_step: &'static str,
}

impl LearningPattern {
    fn from_group(concept: String, interactions: &[&Interaction]) -> Self {
        let correct = interactions.iter().filter(|i| i.successful).count();
        let mastery_level = if interactions.is_empty() {
            0.0
        } else {
            correct as f64 / interactions.len() as f64
        };
        let trend = trend(interactions);
        Self {
            concept,
            mastery_level,
            progress_rate: progress_rate(interactions, mastery_level),
            trend,
            recommended_next_step: recommended_step(mastery_level, trend),
        }
    }
}

fn trend(interactions: &[&Interaction]) -> Trend {
    if interactions.len() <= TREND_WINDOW {
        return Trend::Stable;
    }
    let (earlier, recent) = interactions.split_at(interactions.len() - TREND_WINDOW);
    let rate = |slice: &[&Interaction]| {
        slice.iter().filter(|i| i.successful).count() as f64 / slice.len() as f64
    };
    let (recent_rate, earlier_rate) = (rate(recent), rate(earlier));

    if recent_rate > earlier_rate + TREND_MARGIN {
        Trend::Improving
    } else if recent_rate < earlier_rate - TREND_MARGIN {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

fn progress_rate(interactions: &[&Interaction], mastery_level: f64) -> f64 {
    let (Some(first), Some(last)) = (interactions.first(), interactions.last()) else {
        return 0.0;
    };
    let span_ms = last.timestamp_ms.saturating_sub(first.timestamp_ms);
    if interactions.len() < 2 || span_ms <= 0 {
        return 0.0;
    }
    mastery_level / (span_ms as f64 / 60_000.0)
}

fn recommended_step(mastery_level: f64, trend: Trend) -> &'static str {
    if mastery_level >= 0.8 && trend != Trend::Declining {
        "advance_difficulty"
    } else if mastery_level < 0.4 || trend == Trend::Declining {
        "review_basics"
    } else {
        "continue_practice"
    }
}

/// Group interactions by concept, in order of first appearance.
fn learning_patterns(interactions: &[Interaction]) -> Vec<LearningPattern> {
    let mut groups: Vec<(String, Vec<&Interaction>)> = Vec::new();
    for interaction in interactions {
        match groups.iter_mut().find(|(c, _)| *c == interaction.concept) {
            Some((_, group)) => group.push(interaction),
            None => groups.push((interaction.concept.clone(), vec![interaction])),
        }
    }
    groups
        .into_iter()
        .map(|(concept, group)| LearningPattern::from_group(concept, &group))
        .collect()
}

fn recommendations(metrics: &SessionMetrics, patterns: &[LearningPattern]) -> Vec<String> {
    let mut out = Vec::new();
    if metrics.accuracy < 0.5 {
        out.push("Lower the difficulty and give more visual hints".to_string());
    } else if metrics.accuracy > 0.8 {
        out.push("Raise the difficulty to keep the challenge".to_string());
    }

    if metrics.average_response_time_ms > 5000.0 {
        out.push("The child needs more time, reduce time pressure".to_string());
    } else if metrics.average_response_time_ms > 0.0 && metrics.average_response_time_ms < 1000.0 {
        out.push("Very fast answers, consider more complexity".to_string());
    }

    let struggling: Vec<&str> = patterns
        .iter()
        .filter(|p| p.mastery_level < 0.6)
        .map(|p| p.concept.as_str())
        .collect();
    if !struggling.is_empty() {
        out.push(format!("Reinforce concepts: {}", struggling.join(", ")));
    }

    if out.is_empty() {
        out.push("Keep the current learning pace".to_string());
    }
    out
}

fn next_steps(metrics: &SessionMetrics, patterns: &[LearningPattern]) -> Vec<String> {
    let mut out = vec![if metrics.accuracy >= 0.8 && metrics.max_streak >= 5 {
        "Introduce new concepts or raise the difficulty".to_string()
    } else if metrics.accuracy < 0.5 {
        "Review the basic concepts with extra support".to_string()
    } else {
        "Keep practicing variations at the same level".to_string()
    }];

    for pattern in patterns {
        if pattern.trend == Trend::Improving && pattern.mastery_level > 0.7 {
            out.push(format!("Advance on {}: positive trend", pattern.concept));
        } else if pattern.trend == Trend::Declining {
            out.push(format!("Reinforce {}: needs attention", pattern.concept));
        }
    }
    out
}

fn insight_prompt(metrics: &SessionMetrics, patterns: &[LearningPattern], game_type: &str) -> String {
    format!(
        "Analiza el rendimiento de un niño en un juego educativo de {game_type}:\n\n\
         Métricas:\n\
         - Precisión: {:.1}%\n\
         - Intentos totales: {}\n\
         - Tiempo promedio de respuesta: {:.0}ms\n\
         - Racha máxima: {}\n\n\
         Patrones identificados: {} conceptos analizados\n\n\
         Genera un breve insight educativo (máximo 50 palabras) sobre el progreso del niño y una recomendación específica.",
        metrics.accuracy * 100.0,
        metrics.total_attempts,
        metrics.average_response_time_ms,
        metrics.max_streak,
        patterns.len()
    )
}

fn fallback_insight(metrics: &SessionMetrics) -> &'static str {
    if metrics.accuracy > 0.7 {
        "El niño muestra un buen progreso y comprensión de los conceptos."
    } else if metrics.accuracy > 0.4 {
        "El niño está aprendiendo gradualmente, continuar con apoyo."
    } else {
        "El niño necesita más práctica y apoyo para dominar estos conceptos."
    }
}

/// One analysed session, kept for later inspection.
#[derive(Debug, Clone, Serialize)]
pub struct SessionAnalysis {
    pub child_id: String,
    pub timestamp: DateTime<Utc>,
    pub metrics: SessionMetrics,
    pub patterns: Vec<LearningPattern>,
}

#[derive(Debug, Default)]
struct AnalyticsState {
    latest_metrics: HashMap<String, SessionMetrics>,
    sessions: VecDeque<SessionAnalysis>,
}

/// Session performance analysis.
#[derive(Debug, Default)]
pub struct AnalyticsExpert {
    state: Mutex<AnalyticsState>,
}

impl AnalyticsExpert {
    /// Metrics of the child's most recent analysed session.
    pub fn latest_metrics(&self, child_id: &str) -> Option<SessionMetrics> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.latest_metrics.get(child_id).cloned())
    }

    /// Up to the last `n` analyses, oldest first.
    pub fn recent_sessions(&self, n: usize) -> Vec<SessionAnalysis> {
        self.state
            .lock()
            .map(|s| {
                let skip = s.sessions.len().saturating_sub(n);
                s.sessions.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    fn remember(&self, child_id: &str, metrics: &SessionMetrics, patterns: &[LearningPattern]) {
        let Ok(mut state) = self.state.lock() else {
            warn!(child_id, "Analytics state unavailable");
            return;
        };
        state
            .latest_metrics
            .insert(child_id.to_string(), metrics.clone());
        state.sessions.push_back(SessionAnalysis {
            child_id: child_id.to_string(),
            timestamp: Utc::now(),
            metrics: metrics.clone(),
            patterns: patterns.to_vec(),
        });
        while state.sessions.len() > SESSION_ANALYSES {
            state.sessions.pop_front();
        }
    }

    async fn analyze(&self, client: &RateLimitedClient, req: &PerformanceRequest) -> AgentResult {
        let interactions = &req.session.interactions;
        let metrics = SessionMetrics::from_interactions(interactions);
        let patterns = learning_patterns(interactions);

        let prompt = insight_prompt(&metrics, &patterns, &req.game_type);
        let insights = match client
            .generate_for_child(Some("educador"), 25, &prompt, Language::Es)
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                warn!(error = %err, child_id = %req.child_id, "Insight generation failed, using fallback");
                fallback_insight(&metrics).to_string()
            }
        };

        self.remember(&req.child_id, &metrics, &patterns);

        AgentResult::success(
            json!({
                "type": "performance_analysis",
                "metrics": metrics,
                "patterns": patterns,
                "insights": insights,
                "recommendations": recommendations(&metrics, &patterns),
                "next_steps": next_steps(&metrics, &patterns),
            }),
            format!(
                "Analyzed performance for {} game with {} attempts",
                req.game_type, metrics.total_attempts
            ),
            metrics.confidence(),
        )
    }
}

#[async_trait]
impl Playbook for AnalyticsExpert {
    const ROLE: AgentRole = AgentRole::AnalyticsExpert;

    async fn run(
        &self,
        client: &RateLimitedClient,
        task: &EnrichedTask,
    ) -> CrewResult<AgentResult> {
        Ok(match &task.task.payload {
            TaskPayload::AnalyzePerformance(req) => self.analyze(client, req).await,
            _ => unsupported(Self::ROLE, task),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use educrew_core::{SessionData, Task};
    use educrew_responder::{ResponderError, RetryPolicy};
    use educrew_testing::ScriptedResponder;
    use std::sync::Arc;

    fn answer(concept: &str, successful: bool, at_ms: i64, response_ms: u64) -> Interaction {
        Interaction {
            timestamp_ms: at_ms,
            concept: concept.to_string(),
            successful,
            response_time_ms: Some(response_ms),
        }
    }

    #[test]
    fn test_metrics_and_streaks() {
        let interactions = vec![
            answer("red", true, 0, 1000),
            answer("red", true, 1000, 2000),
            answer("red", false, 2000, 3000),
            answer("blue", true, 3000, 4000),
        ];
        let metrics = SessionMetrics::from_interactions(&interactions);
        assert_eq!(metrics.total_attempts, 4);
        assert_eq!(metrics.correct_answers, 3);
        assert_eq!(metrics.incorrect_answers, 1);
        assert_eq!(metrics.accuracy, 0.75);
        assert_eq!(metrics.average_response_time_ms, 2500.0);
        assert_eq!(metrics.streak, 1);
        assert_eq!(metrics.max_streak, 2);
    }

    #[test]
    fn test_empty_session_confidence_floor() {
        let metrics = SessionMetrics::from_interactions(&[]);
        assert_eq!(metrics, SessionMetrics::default());
        assert_eq!(metrics.confidence(), 0.1);
    }

    #[test]
    fn test_confidence_scales_with_attempts() {
        let mut metrics = SessionMetrics {
            total_attempts: 20,
            accuracy: 0.9,
            ..Default::default()
        };
        assert_eq!(metrics.confidence(), 1.0);
        metrics.accuracy = 0.5;
        assert!((metrics.confidence() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_patterns_group_by_concept_and_detect_trend() {
        let mut interactions: Vec<Interaction> = (0..3)
            .map(|i| answer("circle", false, i * 1000, 2000))
            .collect();
        interactions.extend((3..6).map(|i| answer("circle", true, i * 1000, 2000)));
        interactions.push(answer("square", true, 7000, 2000));

        let patterns = learning_patterns(&interactions);
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].concept, "circle");
        assert_eq!(patterns[0].trend, Trend::Improving);
        assert_eq!(patterns[0].mastery_level, 0.5);
        assert_eq!(patterns[0].recommended_next_step, "continue_practice");
        assert!(patterns[0].progress_rate > 0.0);
        assert_eq!(patterns[1].trend, Trend::Stable);
        assert_eq!(patterns[1].progress_rate, 0.0);
    }

    #[test]
    fn test_declining_concept_is_reviewed() {
        let mut interactions: Vec<Interaction> = (0..3)
            .map(|i| answer("green", true, i * 1000, 2000))
            .collect();
        interactions.extend((3..6).map(|i| answer("green", false, i * 1000, 2000)));
        let patterns = learning_patterns(&interactions);
        assert_eq!(patterns[0].trend, Trend::Declining);
        assert_eq!(patterns[0].recommended_next_step, "review_basics");

        let metrics = SessionMetrics::from_interactions(&interactions);
        let steps = next_steps(&metrics, &patterns);
        assert!(steps.iter().any(|s| s.contains("Reinforce green")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_analysis_falls_back_and_remembers_session() {
        let expert = AnalyticsExpert::default();
        let client = RateLimitedClient::new(
            Arc::new(ScriptedResponder::new().fail_always(ResponderError::failed("down"))),
            RetryPolicy::default(),
        );
        let task = EnrichedTask::standalone(Task::new(TaskPayload::AnalyzePerformance(
            PerformanceRequest {
                child_id: "ana".to_string(),
                session: SessionData {
                    interactions: vec![answer("red", false, 0, 9000), answer("red", false, 10, 9000)],
                    ..Default::default()
                },
                ..Default::default()
            },
        )));

        let result = expert.run(&client, &task).await.unwrap();
        assert!(result.success);
        assert_eq!(result.confidence, 0.2);
        assert_eq!(
            result.data["insights"],
            "El niño necesita más práctica y apoyo para dominar estos conceptos."
        );
        let recommendations = result.data["recommendations"].as_array().unwrap();
        assert_eq!(recommendations.len(), 3);
        assert_eq!(expert.latest_metrics("ana").unwrap().total_attempts, 2);
        assert_eq!(expert.recent_sessions(10).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extreme_timestamps_still_analyse() {
        let expert = AnalyticsExpert::default();
        let client = RateLimitedClient::new(
            Arc::new(ScriptedResponder::new().reply("Buen trabajo.")),
            RetryPolicy::default(),
        );
        let task = EnrichedTask::standalone(Task::new(TaskPayload::AnalyzePerformance(
            PerformanceRequest {
                child_id: "ana".to_string(),
                session: SessionData {
                    interactions: vec![
                        answer("red", true, i64::MIN, u64::MAX),
                        answer("red", true, i64::MAX, u64::MAX),
                    ],
                    ..Default::default()
                },
                ..Default::default()
            },
        )));

        let result = expert.run(&client, &task).await.unwrap();
        assert!(result.success);
        let patterns = learning_patterns(&[
            answer("red", true, i64::MIN, 1000),
            answer("red", true, i64::MAX, 1000),
        ]);
        assert!(patterns[0].progress_rate > 0.0);
        assert!(patterns[0].progress_rate.is_finite());
        assert_eq!(expert.latest_metrics("ana").unwrap().total_attempts, 2);
    }
}
