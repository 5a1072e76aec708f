//! # Scripted Responder
//!
//! A [`Responder`] that replays a queue of replies and records every call.
//! Clones share the script and the call log, so a test can hand one clone to
//! a client and inspect the other afterwards.

use async_trait::async_trait;
use educrew_responder::{GenerationRequest, Responder, ResponderError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Reply used once the script is exhausted.
pub const DEFAULT_REPLY: &str = "ok";

#[derive(Debug, Default)]
struct ScriptState {
    replies: VecDeque<Result<String, ResponderError>>,
    fallback: Option<ResponderError>,
    calls: Vec<Instant>,
    prompts: Vec<String>,
}

/// Replays scripted successes, throttles and failures in order.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResponder {
    state: Arc<Mutex<ScriptState>>,
    latency: Option<Duration>,
}

impl ScriptedResponder {
    /// Create a responder that answers [`DEFAULT_REPLY`] to everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    /// Queue a throttling error without a server hint.
    pub fn throttle(self) -> Self {
        self.push(Err(ResponderError::Throttled { retry_after: None }))
    }

    /// Queue an arbitrary error.
    pub fn fail(self, err: ResponderError) -> Self {
        self.push(Err(err))
    }

    /// Answer every unscripted call with `err` instead of the default reply.
    pub fn fail_always(self, err: ResponderError) -> Self {
        self.state.lock().unwrap().fallback = Some(err);
        self
    }

    /// Delay each call by `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn push(self, reply: Result<String, ResponderError>) -> Self {
        self.state.lock().unwrap().replies.push_back(reply);
        self
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Arrival instant of each call, in order.
    pub fn calls(&self) -> Vec<Instant> {
        self.state.lock().unwrap().calls.clone()
    }

    /// User prompt of each call, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.state.lock().unwrap().prompts.clone()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ResponderError> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Instant::now());
            state.prompts.push(request.user_prompt.clone());
            match state.replies.pop_front() {
                Some(reply) => reply,
                None => match &state.fallback {
                    Some(err) => Err(err.clone()),
                    None => Ok(DEFAULT_REPLY.to_string()),
                },
            }
        };
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        reply
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use educrew_core::Language;

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest::new(prompt, Language::Es)
    }

    #[tokio::test]
    async fn test_replays_script_then_default() {
        let responder = ScriptedResponder::new().reply("hola").throttle();
        let observer = responder.clone();

        assert_eq!(responder.generate(&request("a")).await.unwrap(), "hola");
        assert!(responder.generate(&request("b")).await.unwrap_err().is_throttled());
        assert_eq!(responder.generate(&request("c")).await.unwrap(), DEFAULT_REPLY);

        assert_eq!(observer.call_count(), 3);
        assert_eq!(observer.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_fail_always_applies_after_script() {
        let responder = ScriptedResponder::new()
            .reply("first")
            .fail_always(ResponderError::failed("down"));
        assert!(responder.generate(&request("a")).await.is_ok());
        assert_eq!(
            responder.generate(&request("b")).await,
            Err(ResponderError::failed("down"))
        );
        assert_eq!(
            responder.generate(&request("c")).await,
            Err(ResponderError::failed("down"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_delays_reply() {
        let responder = ScriptedResponder::new().with_latency(Duration::from_secs(3));
        let start = Instant::now();
        responder.generate(&request("a")).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
