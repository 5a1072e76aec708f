//! Long-lived learning memory per child.
//!
//! Session memories and milestones stay in the agent. The adaptive profile
//! is persisted through the injected [`ProfileStore`] under
//! `profile:<child_id>`, so it survives the agent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use educrew_core::{
    AgentResult, AgentRole, CrewError, CrewResult, EnrichedTask, Language, MemoryRequest,
    MilestoneInput, ProfileStore, SessionData, TaskPayload,
};
use educrew_responder::RateLimitedClient;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use super::{Playbook, unsupported};

const SESSION_MEMORIES: usize = 100;
const TRACKED_CHILDREN: usize = 1000;
const MILESTONES_PER_CHILD: usize = 50;
const ATTENTION_WINDOW: usize = 5;
const MIN_ATTENTION_SPAN_SECS: u64 = 120;
const DEFAULT_SESSION_MINUTES: u64 = 5;
const DEFAULT_MILESTONE_MASTERY: f64 = 0.8;

fn profile_key(child_id: &str) -> String {
    format!("profile:{}", child_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredDifficulty {
    Easy,
    Medium,
    Hard,
    Adaptive,
}

impl PreferredDifficulty {
    fn from_accuracy(accuracy: f64) -> Self {
        if accuracy > 0.9 {
            PreferredDifficulty::Hard
        } else if accuracy > 0.7 {
            PreferredDifficulty::Medium
        } else if accuracy > 0.5 {
            PreferredDifficulty::Easy
        } else {
            PreferredDifficulty::Adaptive
        }
    }
}

/// How a child learns best, as inferred from their sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveProfile {
    pub child_id: String,
    pub learning_style: LearningStyle,
    pub preferred_difficulty: PreferredDifficulty,
    pub attention_span_secs: u64,
    pub motivation_triggers: Vec<String>,
    pub struggling_concepts: BTreeSet<String>,
    pub mastered_concepts: BTreeSet<String>,
    pub optimal_session_minutes: u64,
    pub last_updated: DateTime<Utc>,
}

impl AdaptiveProfile {
    fn new(child_id: &str) -> Self {
        Self {
            child_id: child_id.to_string(),
            learning_style: LearningStyle::Mixed,
            preferred_difficulty: PreferredDifficulty::Medium,
            attention_span_secs: 180,
            motivation_triggers: vec!["celebration".to_string(), "achievement".to_string()],
            struggling_concepts: BTreeSet::new(),
            mastered_concepts: BTreeSet::new(),
            optimal_session_minutes: DEFAULT_SESSION_MINUTES,
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSignificance {
    Low,
    Medium,
    High,
}

/// Milestone weight by mastery level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    Minor,
    Major,
    Breakthrough,
}

impl Significance {
    pub fn from_mastery(mastery_level: f64) -> Self {
        if mastery_level >= 0.95 {
            Significance::Breakthrough
        } else if mastery_level >= 0.8 {
            Significance::Major
        } else {
            Significance::Minor
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub accuracy: f64,
    pub total_attempts: usize,
    pub average_time_ms: f64,
    pub successful: usize,
    pub failed: usize,
}

impl PerformanceSummary {
    fn of(session: &SessionData) -> Self {
        let total_attempts = session.interactions.len();
        let successful = session.interactions.iter().filter(|i| i.successful).count();
        let times: Vec<u64> = session
            .interactions
            .iter()
            .filter_map(|i| i.response_time_ms)
            .collect();
        Self {
            accuracy: session.accuracy().unwrap_or(0.0),
            total_attempts,
            average_time_ms: if times.is_empty() {
                0.0
            } else {
                times.iter().map(|&t| t as f64).sum::<f64>() / times.len() as f64
            },
            successful,
            failed: total_attempts - successful,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionMemory {
    pub id: String,
    pub child_id: String,
    pub timestamp: DateTime<Utc>,
    pub interaction_type: String,
    pub duration_ms: u64,
    pub summary: PerformanceSummary,
    pub mood: String,
    pub concepts: BTreeSet<String>,
    pub significance: SessionSignificance,
}

#[derive(Debug, Clone, Serialize)]
pub struct Milestone {
    pub id: String,
    pub concept: String,
    pub achieved_at: DateTime<Utc>,
    pub mastery_level: f64,
    pub context: String,
    pub significance: Significance,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConceptHistory {
    pub first_encounter: DateTime<Utc>,
    pub session_count: u32,
    pub last_practiced: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LongTermMemory {
    pub first_session: DateTime<Utc>,
    pub last_session: DateTime<Utc>,
    pub total_sessions: u32,
    pub total_play_time_ms: u64,
    pub concept_history: BTreeMap<String, ConceptHistory>,
    /// Crew executions reported through synthetic memory updates.
    pub crew_executions: u32,
}

#[derive(Debug, Default)]
struct MemoryState {
    sessions: VecDeque<SessionMemory>,
    long_term: HashMap<String, LongTermMemory>,
    milestones: HashMap<String, Vec<Milestone>>,
    next_id: u64,
}

impl MemoryState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{}", prefix, self.next_id)
    }

    fn record_session(&mut self, req: &MemoryRequest) -> SessionMemory {
        let now = Utc::now();
        let summary = PerformanceSummary::of(&req.session);
        let significance = session_significance(&summary, req.session.duration_ms);
        let memory = SessionMemory {
            id: self.next_id("session"),
            child_id: req.child_id.clone(),
            timestamp: now,
            interaction_type: req.interaction_type.clone(),
            duration_ms: req.session.duration_ms,
            summary,
            mood: req
                .session
                .mood
                .clone()
                .unwrap_or_else(|| "neutral".to_string()),
            concepts: req
                .session
                .interactions
                .iter()
                .map(|i| i.concept.clone())
                .collect(),
            significance,
        };

        self.sessions.push_back(memory.clone());
        while self.sessions.len() > SESSION_MEMORIES {
            self.sessions.pop_front();
        }

        if !self.long_term.contains_key(&req.child_id) {
            self.evict_stalest_child();
        }
        let long_term = self
            .long_term
            .entry(req.child_id.clone())
            .or_insert_with(|| LongTermMemory {
                first_session: now,
                last_session: now,
                total_sessions: 0,
                total_play_time_ms: 0,
                concept_history: BTreeMap::new(),
                crew_executions: 0,
            });
        long_term.total_sessions = long_term.total_sessions.saturating_add(1);
        long_term.total_play_time_ms = long_term
            .total_play_time_ms
            .saturating_add(req.session.duration_ms);
        long_term.last_session = now;
        if req.execution.is_some() {
            long_term.crew_executions = long_term.crew_executions.saturating_add(1);
        }
        for concept in &memory.concepts {
            let history = long_term
                .concept_history
                .entry(concept.clone())
                .or_insert_with(|| ConceptHistory {
                    first_encounter: now,
                    session_count: 0,
                    last_practiced: now,
                });
            history.session_count = history.session_count.saturating_add(1);
            history.last_practiced = now;
        }

        memory
    }

    /// Forgets the child seen longest ago once the long-term table is full.
    fn evict_stalest_child(&mut self) {
        if self.long_term.len() < TRACKED_CHILDREN {
            return;
        }
        let stalest = self
            .long_term
            .iter()
            .min_by_key(|(_, memory)| memory.last_session)
            .map(|(child_id, _)| child_id.clone());
        if let Some(child_id) = stalest {
            self.long_term.remove(&child_id);
            self.milestones.remove(&child_id);
        }
    }

    fn child_sessions<'a>(&'a self, child_id: &'a str) -> impl Iterator<Item = &'a SessionMemory> {
        self.sessions.iter().filter(move |s| s.child_id == child_id)
    }

    /// Average duration of the child's last few sessions, in seconds.
    fn attention_span_secs(&self, child_id: &str) -> u64 {
        let durations: Vec<u64> = self.child_sessions(child_id).map(|s| s.duration_ms).collect();
        let recent = &durations[durations.len().saturating_sub(ATTENTION_WINDOW)..];
        if recent.is_empty() {
            return MIN_ATTENTION_SPAN_SECS;
        }
        let total_ms = recent.iter().fold(0u64, |acc, &d| acc.saturating_add(d));
        let average_ms = total_ms / recent.len() as u64;
        (average_ms / 1000).max(MIN_ATTENTION_SPAN_SECS)
    }

    /// Average length of the child's engaged, successful sessions, in minutes.
    fn optimal_session_minutes(&self, child_id: &str) -> u64 {
        let good: Vec<u64> = self
            .child_sessions(child_id)
            .filter(|s| s.summary.accuracy > 0.6 && s.significance != SessionSignificance::Low)
            .map(|s| s.duration_ms)
            .collect();
        if good.is_empty() {
            return DEFAULT_SESSION_MINUTES;
        }
        let average_ms = good.iter().map(|&d| d as f64).sum::<f64>() / good.len() as f64;
        (average_ms / 60_000.0).round() as u64
    }

    fn record_milestones(&mut self, child_id: &str, inputs: &[MilestoneInput]) -> Vec<Milestone> {
        let processed: Vec<Milestone> = inputs
            .iter()
            .map(|input| {
                let mastery_level = input.mastery_level.unwrap_or(DEFAULT_MILESTONE_MASTERY);
                Milestone {
                    id: self.next_id("milestone"),
                    concept: input.concept.clone().unwrap_or_else(|| "unknown".to_string()),
                    achieved_at: Utc::now(),
                    mastery_level,
                    context: input.context.clone().unwrap_or_else(|| "game".to_string()),
                    significance: Significance::from_mastery(mastery_level),
                }
            })
            .collect();
        let achieved = self.milestones.entry(child_id.to_string()).or_default();
        achieved.extend(processed.iter().cloned());
        let excess = achieved.len().saturating_sub(MILESTONES_PER_CHILD);
        achieved.drain(..excess);
        processed
    }

    fn stats(&self, child_id: &str, profile: &AdaptiveProfile) -> serde_json::Value {
        let long_term = self.long_term.get(child_id);
        json!({
            "total_sessions": long_term.map_or(0, |m| m.total_sessions),
            "total_play_time_minutes": long_term
                .map_or(0, |m| (m.total_play_time_ms as f64 / 60_000.0).round() as u64),
            "concepts_encountered": long_term.map_or(0, |m| m.concept_history.len()),
            "milestones_achieved": self.milestones.get(child_id).map_or(0, Vec::len),
            "crew_executions": long_term.map_or(0, |m| m.crew_executions),
            "learning_style": profile.learning_style,
        })
    }
}

fn session_significance(summary: &PerformanceSummary, duration_ms: u64) -> SessionSignificance {
    if summary.accuracy > 0.8 && duration_ms > 300_000 {
        SessionSignificance::High
    } else if summary.total_attempts > 10 || duration_ms > 180_000 {
        SessionSignificance::Medium
    } else {
        SessionSignificance::Low
    }
}

fn learning_style(summary: &PerformanceSummary) -> LearningStyle {
    if summary.average_time_ms < 2000.0 && summary.accuracy > 0.7 {
        LearningStyle::Visual
    } else if summary.average_time_ms > 4000.0 {
        LearningStyle::Auditory
    } else {
        LearningStyle::Mixed
    }
}

fn motivation_triggers(summary: &PerformanceSummary, duration_ms: u64) -> Vec<String> {
    let mut triggers = vec!["celebration"];
    if summary.accuracy > 0.8 {
        triggers.extend(["achievement", "progress"]);
    }
    if duration_ms > 300_000 {
        triggers.extend(["persistence", "dedication"]);
    }
    triggers.into_iter().map(String::from).collect()
}

fn fallback_insight(profile: &AdaptiveProfile) -> String {
    let mastered = profile.mastered_concepts.len();
    let struggling = profile.struggling_concepts.len();
    if mastered > struggling {
        format!(
            "El niño muestra buen progreso con {} conceptos dominados. Continuar con el ritmo actual.",
            mastered
        )
    } else if struggling > 0 {
        format!(
            "Necesita refuerzo en {} conceptos. Considerar reducir dificultad temporalmente.",
            struggling
        )
    } else {
        "Progreso estable. Mantener variedad en actividades para sostener el interés.".to_string()
    }
}

fn join(concepts: &BTreeSet<String>) -> String {
    concepts.iter().cloned().collect::<Vec<_>>().join(", ")
}

/// Persistent per-child memory and adaptive profiles.
pub struct MemoryKeeper {
    profiles: Arc<dyn ProfileStore>,
    state: Mutex<MemoryState>,
}

impl std::fmt::Debug for MemoryKeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKeeper").finish_non_exhaustive()
    }
}

impl MemoryKeeper {
    pub fn new(profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            profiles,
            state: Mutex::new(MemoryState::default()),
        }
    }

    // State stays usable after a panic in another task.
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The child's stored profile, if any.
    pub fn profile(&self, child_id: &str) -> CrewResult<Option<AdaptiveProfile>> {
        match self.profiles.get(&profile_key(child_id))? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn long_term_memory(&self, child_id: &str) -> Option<LongTermMemory> {
        self.state().long_term.get(child_id).cloned()
    }

    pub fn milestones(&self, child_id: &str) -> Vec<Milestone> {
        self.state()
            .milestones
            .get(child_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn session_count(&self) -> usize {
        self.state().sessions.len()
    }

    fn updated_profile(
        &self,
        req: &MemoryRequest,
        session: &SessionMemory,
    ) -> CrewResult<AdaptiveProfile> {
        let mut profile = match self.profile(&req.child_id) {
            Ok(Some(profile)) => profile,
            Ok(None) => AdaptiveProfile::new(&req.child_id),
            Err(err @ CrewError::ProfileStore(_)) => return Err(err),
            Err(err) => {
                warn!(child_id = %req.child_id, error = %err, "Stored profile unreadable, starting fresh");
                AdaptiveProfile::new(&req.child_id)
            }
        };

        let summary = &session.summary;
        if summary.total_attempts > 0 {
            profile.learning_style = learning_style(summary);
            profile.preferred_difficulty = PreferredDifficulty::from_accuracy(summary.accuracy);
            if summary.accuracy > 0.8 {
                for concept in &session.concepts {
                    profile.struggling_concepts.remove(concept);
                    profile.mastered_concepts.insert(concept.clone());
                }
            } else if summary.accuracy < 0.5 {
                for concept in &session.concepts {
                    profile.mastered_concepts.remove(concept);
                    profile.struggling_concepts.insert(concept.clone());
                }
            }
        }
        profile.motivation_triggers = motivation_triggers(summary, session.duration_ms);

        {
            let state = self.state();
            profile.attention_span_secs = state.attention_span_secs(&req.child_id);
            profile.optimal_session_minutes = state.optimal_session_minutes(&req.child_id);
        }
        profile.last_updated = Utc::now();

        self.profiles
            .set(&profile_key(&req.child_id), serde_json::to_value(&profile)?)?;
        Ok(profile)
    }

    async fn insight(
        &self,
        client: &RateLimitedClient,
        req: &MemoryRequest,
        session: &SessionMemory,
        profile: &AdaptiveProfile,
    ) -> String {
        if req.session.interactions.is_empty() {
            debug!(child_id = %req.child_id, "No interactions to reflect on");
            return fallback_insight(profile);
        }

        let (total_sessions, play_minutes, recent_milestones) = {
            let state = self.state();
            let long_term = state.long_term.get(&req.child_id);
            let recent: Vec<String> = state
                .milestones
                .get(&req.child_id)
                .map(|m| m.iter().rev().take(3).map(|m| m.concept.clone()).collect())
                .unwrap_or_default();
            (
                long_term.map_or(0, |m| m.total_sessions),
                long_term.map_or(0, |m| m.total_play_time_ms / 60_000),
                recent.join(", "),
            )
        };

        let prompt = format!(
            "Analiza el progreso de aprendizaje de un niño basado en:\n\n\
             Sesión actual:\n\
             - Duración: {}s\n\
             - Conceptos practicados: {}\n\
             - Rendimiento: {:.0}% precisión\n\n\
             Historial:\n\
             - Total de sesiones: {}\n\
             - Tiempo total de juego: {}min\n\
             - Hitos recientes: {}\n\n\
             Perfil adaptativo:\n\
             - Conceptos dominados: {}\n\
             - Conceptos difíciles: {}\n\n\
             Genera un insight breve (máximo 40 palabras) sobre el progreso y una recomendación personalizada.",
            session.duration_ms / 1000,
            join(&session.concepts),
            session.summary.accuracy * 100.0,
            total_sessions,
            play_minutes,
            recent_milestones,
            join(&profile.mastered_concepts),
            join(&profile.struggling_concepts),
        );

        match client
            .generate_for_child(Some("memoria"), 25, &prompt, Language::Es)
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                warn!(error = %err, child_id = %req.child_id, "Memory insight failed, using fallback");
                fallback_insight(profile)
            }
        }
    }

    async fn update(&self, client: &RateLimitedClient, req: &MemoryRequest) -> CrewResult<AgentResult> {
        let session = self.state().record_session(req);

        let profile = match self.updated_profile(req, &session) {
            Ok(profile) => profile,
            Err(err) => {
                warn!(child_id = %req.child_id, error = %err, "Profile update failed, basic memory update only");
                return Ok(AgentResult::success(
                    json!({
                        "type": "basic_memory_update",
                        "message": "Memory updated without profile",
                        "session_recorded": true,
                    }),
                    "Fallback memory update due to profile store error",
                    0.6,
                ));
            }
        };

        let milestones = self
            .state()
            .record_milestones(&req.child_id, &req.new_milestones);

        let insights = self.insight(client, req, &session, &profile).await;

        let stats = self.state().stats(&req.child_id, &profile);

        Ok(AgentResult::success(
            json!({
                "type": "memory_update",
                "session_memory": session,
                "adaptive_profile": profile,
                "new_milestones": milestones,
                "insights": insights,
                "memory_stats": stats,
            }),
            format!(
                "Updated memory for child {} with {} new interactions",
                req.child_id,
                req.session.interactions.len()
            ),
            0.95,
        ))
    }
}

#[async_trait]
impl Playbook for MemoryKeeper {
    const ROLE: AgentRole = AgentRole::MemoryKeeper;

    async fn run(
        &self,
        client: &RateLimitedClient,
        task: &EnrichedTask,
    ) -> CrewResult<AgentResult> {
        match &task.task.payload {
            TaskPayload::UpdateMemory(req) => self.update(client, req).await,
            _ => Ok(unsupported(Self::ROLE, task)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use educrew_core::{InMemoryProfileStore, Interaction, Task};
    use educrew_responder::RetryPolicy;
    use educrew_testing::ScriptedResponder;

    struct BrokenStore;

    impl ProfileStore for BrokenStore {
        fn get(&self, _key: &str) -> CrewResult<Option<serde_json::Value>> {
            Err(CrewError::ProfileStore("disk on fire".to_string()))
        }

        fn set(&self, _key: &str, _value: serde_json::Value) -> CrewResult<()> {
            Err(CrewError::ProfileStore("disk on fire".to_string()))
        }
    }

    fn client(responder: ScriptedResponder) -> RateLimitedClient {
        RateLimitedClient::new(Arc::new(responder), RetryPolicy::default())
    }

    fn session(concept: &str, correct: usize, wrong: usize, duration_ms: u64) -> SessionData {
        let interactions = (0..correct)
            .map(|_| true)
            .chain((0..wrong).map(|_| false))
            .enumerate()
            .map(|(i, successful)| Interaction {
                timestamp_ms: i as i64 * 1000,
                concept: concept.to_string(),
                successful,
                response_time_ms: Some(1500),
            })
            .collect();
        SessionData {
            interactions,
            duration_ms,
            mood: None,
        }
    }

    fn update(req: MemoryRequest) -> EnrichedTask {
        EnrichedTask::standalone(Task::new(TaskPayload::UpdateMemory(req)))
    }

    #[test]
    fn test_milestone_significance() {
        assert_eq!(Significance::from_mastery(0.97), Significance::Breakthrough);
        assert_eq!(Significance::from_mastery(0.8), Significance::Major);
        assert_eq!(Significance::from_mastery(0.5), Significance::Minor);
    }

    #[tokio::test]
    async fn test_update_persists_profile() {
        let store = InMemoryProfileStore::new();
        let keeper = MemoryKeeper::new(Arc::new(store.clone()));
        let client = client(ScriptedResponder::new().reply("Va muy bien con el rojo."));

        let result = keeper
            .run(
                &client,
                &update(MemoryRequest {
                    child_id: "ana".to_string(),
                    session: session("red", 10, 0, 400_000),
                    new_milestones: vec![MilestoneInput {
                        concept: Some("red".to_string()),
                        mastery_level: Some(0.96),
                        context: None,
                    }],
                    ..Default::default()
                }),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.data["insights"], "Va muy bien con el rojo.");
        assert_eq!(result.data["new_milestones"][0]["significance"], "breakthrough");
        assert_eq!(result.data["session_memory"]["significance"], "high");

        let profile = keeper.profile("ana").unwrap().unwrap();
        assert_eq!(profile.preferred_difficulty, PreferredDifficulty::Hard);
        assert_eq!(profile.learning_style, LearningStyle::Visual);
        assert!(profile.mastered_concepts.contains("red"));
        assert_eq!(profile.attention_span_secs, 400);
        assert_eq!(profile.optimal_session_minutes, 7);
        assert!(profile.motivation_triggers.contains(&"persistence".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_struggling_concept_moves_out_of_mastered() {
        let keeper = MemoryKeeper::new(Arc::new(InMemoryProfileStore::new()));
        let responder = ScriptedResponder::new();
        let client = client(responder.clone());

        for (correct, wrong) in [(9, 0), (1, 4)] {
            keeper
                .run(
                    &client,
                    &update(MemoryRequest {
                        child_id: "leo".to_string(),
                        session: session("circle", correct, wrong, 60_000),
                        ..Default::default()
                    }),
                )
                .await
                .unwrap();
        }

        let profile = keeper.profile("leo").unwrap().unwrap();
        assert!(profile.struggling_concepts.contains("circle"));
        assert!(profile.mastered_concepts.is_empty());
        assert_eq!(profile.attention_span_secs, MIN_ATTENTION_SPAN_SECS);
        assert_eq!(keeper.long_term_memory("leo").unwrap().total_sessions, 2);
        assert_eq!(keeper.session_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_session_skips_upstream() {
        let responder = ScriptedResponder::new();
        let keeper = MemoryKeeper::new(Arc::new(InMemoryProfileStore::new()));
        let result = keeper
            .run(&client(responder.clone()), &update(MemoryRequest::default()))
            .await
            .unwrap();

        assert_eq!(responder.call_count(), 0);
        assert_eq!(
            result.data["insights"],
            "Progreso estable. Mantener variedad en actividades para sostener el interés."
        );
        let profile = keeper.profile("anonymous").unwrap().unwrap();
        assert_eq!(profile.preferred_difficulty, PreferredDifficulty::Medium);
    }

    #[tokio::test]
    async fn test_broken_store_gives_basic_update() {
        let keeper = MemoryKeeper::new(Arc::new(BrokenStore));
        let result = keeper
            .run(&client(ScriptedResponder::new()), &update(MemoryRequest::default()))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.confidence, 0.6);
        assert_eq!(result.data["type"], "basic_memory_update");
        assert_eq!(keeper.session_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_durations_do_not_break_later_updates() {
        let keeper = MemoryKeeper::new(Arc::new(InMemoryProfileStore::new()));
        let client = client(ScriptedResponder::new());

        for _ in 0..2 {
            let result = keeper
                .run(
                    &client,
                    &update(MemoryRequest {
                        child_id: "ana".to_string(),
                        session: session("red", 3, 1, u64::MAX),
                        ..Default::default()
                    }),
                )
                .await
                .unwrap();
            assert!(result.success);
        }
        assert_eq!(
            keeper.long_term_memory("ana").unwrap().total_play_time_ms,
            u64::MAX
        );

        let result = keeper
            .run(
                &client,
                &update(MemoryRequest {
                    child_id: "leo".to_string(),
                    session: session("blue", 3, 1, 60_000),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data["type"], "memory_update");
    }

    #[tokio::test]
    async fn test_poisoned_state_still_serves_updates() {
        let keeper = Arc::new(MemoryKeeper::new(Arc::new(InMemoryProfileStore::new())));
        let poisoner = Arc::clone(&keeper);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("boom");
        })
        .join();
        assert!(keeper.state.is_poisoned());

        let result = keeper
            .run(&client(ScriptedResponder::new()), &update(MemoryRequest::default()))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(keeper.session_count(), 1);
    }

    #[test]
    fn test_milestones_are_capped_per_child() {
        let mut state = MemoryState::default();
        let inputs: Vec<MilestoneInput> = (0..MILESTONES_PER_CHILD + 5)
            .map(|i| MilestoneInput {
                concept: Some(format!("concept_{}", i)),
                ..Default::default()
            })
            .collect();
        state.record_milestones("ana", &inputs);

        let kept = &state.milestones["ana"];
        assert_eq!(kept.len(), MILESTONES_PER_CHILD);
        assert_eq!(kept[0].concept, "concept_5");
    }

    #[test]
    fn test_long_term_table_forgets_stalest_child() {
        let mut state = MemoryState::default();
        for i in 0..=TRACKED_CHILDREN {
            state.record_session(&MemoryRequest {
                child_id: format!("child_{}", i),
                ..Default::default()
            });
        }
        assert_eq!(state.long_term.len(), TRACKED_CHILDREN);
        assert!(state.long_term.contains_key(&format!("child_{}", TRACKED_CHILDREN)));
    }
}
