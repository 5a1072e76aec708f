use async_trait::async_trait;
use chrono::{DateTime, Utc};
use educrew_core::{
    AgentResult, AgentRole, CelebrationRequest, CrewResult, EnrichedTask, FeedbackRequest,
    Language, TaskPayload,
};
use educrew_responder::RateLimitedClient;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::warn;

use super::{Playbook, unsupported};

const CELEBRATION_HISTORY: usize = 50;
const ANIMATIONS: [&str; 4] = ["bounce", "spin", "pulse", "shake"];
const SOUNDS: [&str; 4] = ["cheer", "applause", "victory", "happy"];

/// A celebration handed out by the specialist.
#[derive(Debug, Clone, Serialize)]
pub struct CelebrationRecord {
    pub correct_answers: u32,
    pub game_type: String,
    pub language: Language,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Celebrations and encouragement.
#[derive(Debug, Default)]
pub struct MotivationSpecialist {
    celebrations: Mutex<VecDeque<CelebrationRecord>>,
}

impl MotivationSpecialist {
    /// Celebrations produced so far, oldest first.
    pub fn celebrations(&self) -> Vec<CelebrationRecord> {
        self.celebrations
            .lock()
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn remember(&self, record: CelebrationRecord) {
        match self.celebrations.lock() {
            Ok(mut celebrations) => {
                celebrations.push_back(record);
                while celebrations.len() > CELEBRATION_HISTORY {
                    celebrations.pop_front();
                }
            }
            Err(e) => warn!(error = %e, "Celebration history unavailable"),
        }
    }

    async fn celebrate(&self, client: &RateLimitedClient, req: &CelebrationRequest) -> AgentResult {
        let prompt = celebration_prompt(req);
        let mut result = match client
            .generate_for_child(Some("amiguito"), 5, &prompt, req.language)
            .await
        {
            Ok(text) => {
                let message = text.trim().to_string();
                let (animation, sound, duration) = pick_effects();
                self.remember(CelebrationRecord {
                    correct_answers: req.correct_answers,
                    game_type: req.game_type.clone(),
                    language: req.language,
                    message: message.clone(),
                    timestamp: Utc::now(),
                });
                AgentResult::success(
                    json!({
                        "type": "celebration",
                        "message": message,
                        "animation": animation,
                        "sound": sound,
                        "duration": duration,
                    }),
                    format!(
                        "Generated celebration for {} correct answers in {} game",
                        req.correct_answers, req.game_type
                    ),
                    0.9,
                )
            }
            Err(err) => {
                warn!(error = %err, "Celebration generation failed, using fallback");
                fallback_celebration(req.language)
            }
        };

        if let Some(achievement) = req.achievement.as_deref().and_then(Achievement::parse) {
            result.data["achievement"] = json!({
                "name": achievement.name(),
                "badge": achievement.badge(),
                "message": achievement.message(req.language),
                "streak": req.streak,
            });
        }
        result
    }
}

#[async_trait]
impl Playbook for MotivationSpecialist {
    const ROLE: AgentRole = AgentRole::MotivationSpecialist;

    async fn run(
        &self,
        client: &RateLimitedClient,
        task: &EnrichedTask,
    ) -> CrewResult<AgentResult> {
        Ok(match &task.task.payload {
            TaskPayload::CreateCelebration(req) => self.celebrate(client, req).await,
            TaskPayload::ProvideFeedback(req) => encourage(client, req).await,
            _ => unsupported(Self::ROLE, task),
        })
    }
}

fn celebration_prompt(req: &CelebrationRequest) -> String {
    format!(
        "Genera un mensaje corto de celebración para un niño que acertó {} respuestas en un juego de {}.\n\
         Idioma: {}\n\
         Máximo 10 palabras, incluye emoji apropiado, edad 3-7 años, muy positivo.\n\
         Ejemplo: ¡Súper bien! ¡3 colores correctos! 🌈",
        req.correct_answers,
        req.game_type,
        req.language.code()
    )
}

fn encouragement_prompt(req: &FeedbackRequest) -> String {
    format!(
        "Genera un mensaje suave de aliento para un niño que cometió {} errores en un juego de {}.\n\
         Idioma: {}\n\
         Máximo 8 palabras, apoyo sin desánimo, edad 3-7 años, enfoque en esfuerzo.\n\
         Ejemplo: ¡Está bien! ¡Sigamos intentando! 💪",
        req.incorrect_answers,
        req.game_type,
        req.language.code()
    )
}

/// Random animation, sound and duration in `[2000, 3000)` ms.
fn pick_effects() -> (&'static str, &'static str, u64) {
    let mut rng = rand::rng();
    let animation = ANIMATIONS.choose(&mut rng).copied().unwrap_or("bounce");
    let sound = SOUNDS.choose(&mut rng).copied().unwrap_or("cheer");
    (animation, sound, 2000 + rng.random_range(0..1000))
}

fn fallback_celebration(language: Language) -> AgentResult {
    let messages: &[&str] = match language {
        Language::Es => &["¡Muy bien! 🎉", "¡Excelente! ⭐", "¡Genial! 🌟"],
        Language::En => &["Very good! 🎉", "Excellent! ⭐", "Great! 🌟"],
    };
    let message = messages
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(messages[0]);

    AgentResult::success(
        json!({
            "type": "celebration",
            "message": message,
            "animation": "bounce",
            "sound": "cheer",
            "duration": 2000,
        }),
        "Fallback celebration message",
        0.7,
    )
}

fn support_level(incorrect_answers: u32) -> &'static str {
    match incorrect_answers {
        0..=1 => "gentle",
        2..=3 => "moderate",
        _ => "strong",
    }
}

async fn encourage(client: &RateLimitedClient, req: &FeedbackRequest) -> AgentResult {
    let prompt = encouragement_prompt(req);
    match client
        .generate_for_child(Some("amiguito"), 5, &prompt, req.language)
        .await
    {
        Ok(text) => AgentResult::success(
            json!({
                "type": "encouragement",
                "message": text.trim(),
                "tone": "supportive",
                "support_level": support_level(req.incorrect_answers),
            }),
            format!(
                "Provided encouragement after {} incorrect attempts",
                req.incorrect_answers
            ),
            0.85,
        ),
        Err(err) => {
            warn!(error = %err, "Encouragement generation failed, using fallback");
            let message = match req.language {
                Language::Es => "¡Inténtalo otra vez! 💪",
                Language::En => "Try again! 💪",
            };
            AgentResult::success(
                json!({
                    "type": "encouragement",
                    "message": message,
                    "tone": "supportive",
                    "support_level": "moderate",
                }),
                "Fallback encouragement message",
                0.6,
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Achievement {
    FirstCorrect,
    Streak5,
    Streak10,
    ColorMaster,
    SpeedDemon,
    Persistent,
}

impl Achievement {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "first_correct" => Achievement::FirstCorrect,
            "streak_5" => Achievement::Streak5,
            "streak_10" => Achievement::Streak10,
            "color_master" => Achievement::ColorMaster,
            "speed_demon" => Achievement::SpeedDemon,
            "persistent" => Achievement::Persistent,
            _ => return None,
        })
    }

    fn name(self) -> &'static str {
        match self {
            Achievement::FirstCorrect => "first_correct",
            Achievement::Streak5 => "streak_5",
            Achievement::Streak10 => "streak_10",
            Achievement::ColorMaster => "color_master",
            Achievement::SpeedDemon => "speed_demon",
            Achievement::Persistent => "persistent",
        }
    }

    fn badge(self) -> &'static str {
        match self {
            Achievement::FirstCorrect => "🎯",
            Achievement::Streak5 => "🌟",
            Achievement::Streak10 => "🏆",
            Achievement::ColorMaster => "🎨",
            Achievement::SpeedDemon => "⚡",
            Achievement::Persistent => "💪",
        }
    }

    fn message(self, language: Language) -> &'static str {
        match (self, language) {
            (Achievement::FirstCorrect, Language::Es) => "¡Tu primera respuesta correcta! 🎯",
            (Achievement::Streak5, Language::Es) => "¡5 seguidas! ¡Eres increíble! 🌟",
            (Achievement::Streak10, Language::Es) => "¡10 en fila! ¡Eres un campeón! 🏆",
            (Achievement::ColorMaster, Language::Es) => "¡Eres un maestro de los colores! 🎨",
            (Achievement::SpeedDemon, Language::Es) => "¡Qué rápido! ⚡",
            (Achievement::Persistent, Language::Es) => "¡Nunca te rindes! 💪",
            (Achievement::FirstCorrect, Language::En) => "Your first correct answer! 🎯",
            (Achievement::Streak5, Language::En) => "5 in a row! You are amazing! 🌟",
            (Achievement::Streak10, Language::En) => "10 in a row! You are a champion! 🏆",
            (Achievement::ColorMaster, Language::En) => "You are a color master! 🎨",
            (Achievement::SpeedDemon, Language::En) => "So fast! ⚡",
            (Achievement::Persistent, Language::En) => "You never give up! 💪",
        }
    }
}
