//! The upstream text-generation boundary.

use async_trait::async_trait;
use educrew_core::Language;
use serde::{Deserialize, Serialize};

use crate::error::ResponderError;

/// One chat-style generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub language: Language,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl GenerationRequest {
    pub fn new(user_prompt: impl Into<String>, language: Language) -> Self {
        Self {
            system_prompt: None,
            user_prompt: user_prompt.into(),
            language,
            max_tokens: 100,
            temperature: 0.7,
            top_p: 0.9,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_sampling(mut self, temperature: f32, top_p: f32) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }
}

/// External text-generation service.
///
/// Only [`RateLimitedClient`](crate::RateLimitedClient) calls a responder;
/// agents never hold one directly.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Generate text, distinguishing throttling from other failures.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ResponderError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "responder"
    }
}

/// Responder used when no upstream is configured. Every call fails, which
/// drives each specialist onto its canned fallback path.
#[derive(Debug, Clone, Default)]
pub struct OfflineResponder;

#[async_trait]
impl Responder for OfflineResponder {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ResponderError> {
        Err(ResponderError::failed("no upstream responder configured"))
    }

    fn name(&self) -> &str {
        "offline"
    }
}
