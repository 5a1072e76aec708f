//! # Rate-Limited Client
//!
//! The single funnel through which every agent reaches the upstream
//! responder. One instance is shared (behind an `Arc`) by the whole crew so
//! spacing and backoff are enforced process-wide.
//!
//! ## Spacing
//!
//! Consecutive upstream attempts start at least `min_interval` apart. The
//! gate is taken before every attempt, retries included, so no two requests
//! ever reach the upstream closer than the interval.
//!
//! ## Retries
//!
//! | Failure | Wait before next attempt |
//! |---------|--------------------------|
//! | Throttled (429) | `min(base * 2^attempt, cap)` |
//! | Anything else | `step * attempt` |
//!
//! When every attempt fails the caller gets [`CrewError::UpstreamThrottled`]
//! or [`CrewError::UpstreamFailure`], depending on the last failure.

use educrew_core::{CrewError, CrewResult, Language};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, warn};

use crate::error::ResponderError;
use crate::policy::RetryPolicy;
use crate::prompts;
use crate::responder::{GenerationRequest, Responder};

/// Spacing-and-retry wrapper around a [`Responder`].
pub struct RateLimitedClient {
    responder: Arc<dyn Responder>,
    policy: RetryPolicy,
    last_call: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for RateLimitedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedClient")
            .field("responder", &self.responder.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl RateLimitedClient {
    pub fn new(responder: Arc<dyn Responder>, policy: RetryPolicy) -> Self {
        Self {
            responder,
            policy,
            last_call: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send one request, spacing and retrying as the policy dictates.
    pub async fn call(&self, request: &GenerationRequest) -> CrewResult<String> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = ResponderError::failed("no attempt made");

        for attempt in 1..=max_attempts {
            self.wait_for_slot().await;

            match self.responder.generate(request).await {
                Ok(text) => {
                    debug!(
                        responder = self.responder.name(),
                        attempt, "Upstream call succeeded"
                    );
                    return Ok(text);
                }
                Err(err) => {
                    warn!(
                        responder = self.responder.name(),
                        attempt,
                        max_attempts,
                        error = %err,
                        "Upstream attempt failed"
                    );
                    if attempt < max_attempts {
                        let delay = self.policy.delay_for(&err, attempt);
                        debug!(delay_ms = delay.as_millis() as u64, "Backing off before retry");
                        sleep(delay).await;
                    }
                    last_error = err;
                }
            }
        }

        Err(match last_error {
            ResponderError::Throttled { .. } => CrewError::UpstreamThrottled {
                attempts: max_attempts,
            },
            ResponderError::Failed(reason) => CrewError::UpstreamFailure {
                attempts: max_attempts,
                reason,
            },
        })
    }

    /// Generate a short, age-appropriate reply about `context`.
    pub async fn generate_for_child(
        &self,
        child_name: Option<&str>,
        age: u8,
        context: &str,
        language: Language,
    ) -> CrewResult<String> {
        let request = GenerationRequest::new(
            prompts::user_prompt(child_name, context, language),
            language,
        )
        .with_system_prompt(prompts::system_prompt(age, language));
        self.call(&request).await
    }

    /// Issue a tiny request and report whether the upstream answered.
    pub async fn test_connection(&self) -> bool {
        let request = GenerationRequest::new("Hello", Language::En).with_max_tokens(10);
        match self.call(&request).await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "Upstream connection test failed");
                false
            }
        }
    }

    /// Suspend until `min_interval` has passed since the previous attempt.
    ///
    /// The lock is held across the sleep so concurrent callers queue up and
    /// each gets its own slot.
    async fn wait_for_slot(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.policy.min_interval();
            if Instant::now() < ready_at {
                debug!(
                    wait_ms = (ready_at - Instant::now()).as_millis() as u64,
                    "Rate limiting upstream call"
                );
                sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}
