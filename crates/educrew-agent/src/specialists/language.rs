use async_trait::async_trait;
use educrew_core::{
    AgentResult, AgentRole, CrewResult, EnrichedTask, FeedbackRequest, Language, TaskPayload,
};
use educrew_responder::RateLimitedClient;
use serde::Serialize;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::{Playbook, unsupported};

const TRANSLATION_CACHE: usize = 500;

const COLORS: [(&str, &str); 10] = [
    ("red", "rojo"),
    ("blue", "azul"),
    ("green", "verde"),
    ("yellow", "amarillo"),
    ("orange", "naranja"),
    ("purple", "morado"),
    ("pink", "rosa"),
    ("brown", "marrón"),
    ("black", "negro"),
    ("white", "blanco"),
];

/// Phrases that can be rendered without the upstream: (key, es, en).
const BASIC_PHRASES: [(&str, &str, &str); 6] = [
    ("good job", "¡Bien hecho!", "Good job!"),
    ("try again", "¡Inténtalo otra vez!", "Try again!"),
    ("correct", "¡Correcto!", "Correct!"),
    ("wrong", "Incorrecto", "Wrong"),
    ("great", "¡Genial!", "Great!"),
    ("excellent", "¡Excelente!", "Excellent!"),
];

const SPANISH_WORDS: [&str; 11] = [
    "el", "la", "es", "un", "una", "que", "de", "y", "en", "muy", "bien",
];
const ENGLISH_WORDS: [&str; 10] = [
    "the", "is", "a", "an", "that", "of", "and", "in", "very", "good",
];

/// Guess whether `text` is Spanish or English from common function words.
///
/// Ties resolve to English.
pub fn detect_language(text: &str) -> Language {
    let (spanish, english) = text
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .fold((0, 0), |(es, en), word| {
            (
                es + usize::from(SPANISH_WORDS.contains(&word.as_str())),
                en + usize::from(ENGLISH_WORDS.contains(&word.as_str())),
            )
        });
    if spanish > english {
        Language::Es
    } else {
        Language::En
    }
}

fn localized<'a>(language: Language, es: &'a str, en: &'a str) -> &'a str {
    match language {
        Language::Es => es,
        Language::En => en,
    }
}

/// Share of produced messages per language.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BilingualRatio {
    pub spanish: f64,
    pub english: f64,
}

type TranslationKey = (String, Language, Language);

#[derive(Debug, Default)]
struct LanguageState {
    translations: HashMap<TranslationKey, String>,
    translation_order: VecDeque<TranslationKey>,
    spanish_messages: u64,
    english_messages: u64,
}

impl LanguageState {
    /// Oldest translations are dropped first.
    fn cache_translation(&mut self, key: TranslationKey, translation: String) {
        if self.translations.insert(key.clone(), translation).is_none() {
            self.translation_order.push_back(key);
        }
        while self.translation_order.len() > TRANSLATION_CACHE {
            if let Some(oldest) = self.translation_order.pop_front() {
                self.translations.remove(&oldest);
            }
        }
    }

    fn ratio(&self) -> BilingualRatio {
        let total = self.spanish_messages + self.english_messages;
        if total == 0 {
            return BilingualRatio {
                spanish: 0.5,
                english: 0.5,
            };
        }
        BilingualRatio {
            spanish: self.spanish_messages as f64 / total as f64,
            english: self.english_messages as f64 / total as f64,
        }
    }
}

/// Bilingual feedback with a translation cache.
#[derive(Debug, Default)]
pub struct LanguageSpecialist {
    state: Mutex<LanguageState>,
}

impl LanguageSpecialist {
    pub fn bilingual_ratio(&self) -> BilingualRatio {
        self.state
            .lock()
            .map(|s| s.ratio())
            .unwrap_or(BilingualRatio {
                spanish: 0.5,
                english: 0.5,
            })
    }

    pub fn cached_translations(&self) -> usize {
        self.state.lock().map(|s| s.translations.len()).unwrap_or(0)
    }

    /// Translate through the upstream, caching successful translations.
    ///
    /// Falls back to the basic phrase table, then to the text itself.
    pub async fn translate(
        &self,
        client: &RateLimitedClient,
        text: &str,
        from: Language,
        to: Language,
    ) -> String {
        if from == to {
            return text.to_string();
        }
        let key = (text.to_string(), from, to);
        let cached = self
            .state
            .lock()
            .ok()
            .and_then(|s| s.translations.get(&key).cloned());
        if let Some(hit) = cached {
            debug!(from = from.code(), to = to.code(), "Translation cache hit");
            return hit;
        }

        let prompt = translation_prompt(text, from, to);
        match client
            .generate_for_child(Some("traductor"), 25, &prompt, to)
            .await
        {
            Ok(raw) => {
                let translation = clean_translation(&raw);
                if let Ok(mut state) = self.state.lock() {
                    state.cache_translation(key, translation.clone());
                }
                translation
            }
            Err(err) => {
                warn!(error = %err, "Translation failed, using phrase table");
                fallback_translation(text, to)
            }
        }
    }

    async fn feedback(&self, client: &RateLimitedClient, req: &FeedbackRequest) -> AgentResult {
        let target = req.language;
        let other = target.other();

        let (primary, secondary, translation_info) = match req.color_name.as_deref() {
            Some(color) if req.context == "color_feedback" && !color.trim().is_empty() => {
                let message = |language| color_message(color, req.is_correct, language);
                (
                    message(target),
                    message(other),
                    json!({
                        "color_name": color,
                        "from_language": target,
                        "to_language": other,
                        "confidence": 1.0,
                    }),
                )
            }
            _ => {
                let text = req
                    .text
                    .clone()
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| {
                        let canned = if req.is_correct { "great" } else { "try again" };
                        canned.to_string()
                    });
                let source = detect_language(&text);
                let (primary, secondary) = if source == target {
                    let translated = self.translate(client, &text, target, other).await;
                    (text.clone(), translated)
                } else {
                    let translated = self.translate(client, &text, source, target).await;
                    (translated, text.clone())
                };
                (
                    primary,
                    secondary,
                    json!({
                        "original_text": text,
                        "from_language": source,
                        "to_language": if source == target { other } else { target },
                        "confidence": 0.8,
                    }),
                )
            }
        };

        let ratio = match self.state.lock() {
            Ok(mut state) => {
                match target {
                    Language::Es => state.spanish_messages += 1,
                    Language::En => state.english_messages += 1,
                }
                state.ratio()
            }
            Err(e) => {
                warn!(error = %e, "Language state unavailable");
                BilingualRatio {
                    spanish: 0.5,
                    english: 0.5,
                }
            }
        };

        AgentResult::success(
            json!({
                "type": "bilingual_feedback",
                "primary_message": primary,
                "secondary_message": secondary,
                "translation_info": translation_info,
                "language_used": target,
                "bilingual_ratio": ratio,
            }),
            format!("Provided bilingual feedback in {}", target.code()),
            0.9,
        )
    }
}

#[async_trait]
impl Playbook for LanguageSpecialist {
    const ROLE: AgentRole = AgentRole::LanguageSpecialist;

    async fn run(
        &self,
        client: &RateLimitedClient,
        task: &EnrichedTask,
    ) -> CrewResult<AgentResult> {
        Ok(match &task.task.payload {
            TaskPayload::ProvideFeedback(req) => self.feedback(client, req).await,
            _ => unsupported(Self::ROLE, task),
        })
    }
}

fn color_message(color: &str, is_correct: bool, language: Language) -> String {
    let lower = color.trim().to_lowercase();
    let (en, es) = COLORS
        .iter()
        .find(|(en, es)| *en == lower || *es == lower)
        .map(|(en, es)| (en.to_string(), es.to_string()))
        .unwrap_or_else(|| (color.to_string(), color.to_string()));

    match (language, is_correct) {
        (Language::Es, true) => format!("¡Muy bien! Es {} 🎉", es),
        (Language::En, true) => format!("Great! It's {} 🎉", en),
        (Language::Es, false) => format!("Es {}. ¡Inténtalo otra vez! 💪", es),
        (Language::En, false) => format!("It's {}. Try again! 💪", en),
    }
}

fn translation_prompt(text: &str, from: Language, to: Language) -> String {
    let name = |language| localized(language, "español", "inglés");
    format!(
        "Traduce este texto de {} a {}:\n\n\"{}\"\n\n\
         Requisitos:\n\
         - Apropiado para niños de 3-7 años\n\
         - Mantener el tono emocional original\n\
         - Máximo simplicidad en vocabulario\n\
         - Solo devolver la traducción, sin explicaciones",
        name(from),
        name(to),
        text
    )
}

fn clean_translation(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '"' | '“' | '”'))
        .collect()
}

fn fallback_translation(text: &str, to: Language) -> String {
    let lower = text.trim().to_lowercase();
    BASIC_PHRASES
        .iter()
        .find(|(key, es, en)| {
            *key == lower || es.to_lowercase() == lower || en.to_lowercase() == lower
        })
        .map(|(_, es, en)| localized(to, es, en).to_string())
        .unwrap_or_else(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use educrew_core::Task;
    use educrew_responder::{ResponderError, RetryPolicy};
    use educrew_testing::ScriptedResponder;
    use std::sync::Arc;

    fn client(responder: ScriptedResponder) -> RateLimitedClient {
        RateLimitedClient::new(Arc::new(responder), RetryPolicy::default())
    }

    fn feedback_task(req: FeedbackRequest) -> EnrichedTask {
        EnrichedTask::standalone(Task::new(TaskPayload::ProvideFeedback(req)))
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("Es muy bien, el rojo"), Language::Es);
        assert_eq!(detect_language("That is a very good answer"), Language::En);
        assert_eq!(detect_language("🌈"), Language::En);
    }

    #[test]
    fn test_color_messages_accept_either_language() {
        assert_eq!(color_message("Rojo", true, Language::En), "Great! It's red 🎉");
        assert_eq!(
            color_message("blue", false, Language::Es),
            "Es azul. ¡Inténtalo otra vez! 💪"
        );
        assert_eq!(color_message("teal", true, Language::Es), "¡Muy bien! Es teal 🎉");
    }

    #[test]
    fn test_fallback_translation() {
        assert_eq!(fallback_translation("Good Job", Language::Es), "¡Bien hecho!");
        assert_eq!(fallback_translation("¡Genial!", Language::En), "Great!");
        assert_eq!(fallback_translation("hola amigo", Language::En), "hola amigo");
    }

    #[tokio::test]
    async fn test_color_feedback_needs_no_upstream() {
        let responder = ScriptedResponder::new();
        let specialist = LanguageSpecialist::default();
        let result = specialist
            .run(
                &client(responder.clone()),
                &feedback_task(FeedbackRequest {
                    context: "color_feedback".to_string(),
                    color_name: Some("green".to_string()),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();

        assert_eq!(result.data["primary_message"], "¡Muy bien! Es verde 🎉");
        assert_eq!(result.data["secondary_message"], "Great! It's green 🎉");
        assert_eq!(result.confidence, 0.9);
        assert_eq!(responder.call_count(), 0);
        assert_eq!(
            specialist.bilingual_ratio(),
            BilingualRatio {
                spanish: 1.0,
                english: 0.0
            }
        );
    }

    #[tokio::test]
    async fn test_translations_are_cached() {
        let responder = ScriptedResponder::new().reply("\"¡Lo lograste!\"");
        let specialist = LanguageSpecialist::default();
        let client = client(responder.clone());

        let first = specialist
            .translate(&client, "You did it", Language::En, Language::Es)
            .await;
        let second = specialist
            .translate(&client, "You did it", Language::En, Language::Es)
            .await;

        assert_eq!(first, "¡Lo lograste!");
        assert_eq!(second, first);
        assert_eq!(responder.call_count(), 1);
        assert_eq!(specialist.cached_translations(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_free_text_falls_back_to_phrase_table() {
        let specialist = LanguageSpecialist::default();
        let client = client(ScriptedResponder::new().fail_always(ResponderError::failed("down")));
        let result = specialist
            .run(
                &client,
                &feedback_task(FeedbackRequest {
                    language: Language::En,
                    is_correct: false,
                    ..Default::default()
                }),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.data["primary_message"], "try again");
        assert_eq!(result.data["secondary_message"], "¡Inténtalo otra vez!");
        assert_eq!(specialist.cached_translations(), 0);
    }

    #[test]
    fn test_translation_cache_is_bounded() {
        let mut state = LanguageState::default();
        for i in 0..TRANSLATION_CACHE + 3 {
            state.cache_translation(
                (format!("phrase {}", i), Language::En, Language::Es),
                format!("frase {}", i),
            );
        }
        assert_eq!(state.translations.len(), TRANSLATION_CACHE);
        assert!(!state
            .translations
            .contains_key(&("phrase 0".to_string(), Language::En, Language::Es)));
        assert_eq!(
            state.translations[&("phrase 3".to_string(), Language::En, Language::Es)],
            "frase 3"
        );
    }
}
