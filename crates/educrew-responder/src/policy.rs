//! # Retry Policy
//!
//! Spacing and backoff parameters for upstream calls.
//!
//! ## Environment Variables
//! - `EDUCREW_RESPONDER_MIN_INTERVAL_MS` - Minimum spacing between calls (default: 2000)
//! - `EDUCREW_RESPONDER_MAX_ATTEMPTS` - Total attempts per call (default: 3)
//! - `EDUCREW_RESPONDER_THROTTLE_BASE_MS` - Base of the throttle backoff (default: 10000)
//! - `EDUCREW_RESPONDER_THROTTLE_CAP_MS` - Upper bound of one throttle wait (default: 60000)
//! - `EDUCREW_RESPONDER_FAILURE_STEP_MS` - Linear step for non-throttle failures (default: 1000)

use educrew_core::env::{EnvLookup, ProcessEnv, get_env_millis, get_env_u32};
use educrew_core::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ResponderError;

/// How the rate-limited client spaces and retries calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub min_interval_ms: u64,
    /// Total attempts, the first call included.
    pub max_attempts: u32,
    pub throttle_base_ms: u64,
    pub throttle_cap_ms: u64,
    pub failure_step_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_interval_ms: 2000,
            max_attempts: 3,
            throttle_base_ms: 10_000,
            throttle_cap_ms: 60_000,
            failure_step_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Load overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an unparseable value or
    /// the result fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv)
    }

    pub fn from_lookup(env: &impl EnvLookup) -> Result<Self, ConfigError> {
        let mut policy = Self::default();
        if let Some(d) = get_env_millis(env, "EDUCREW_RESPONDER_MIN_INTERVAL_MS")? {
            policy.min_interval_ms = d.as_millis() as u64;
        }
        if let Some(n) = get_env_u32(env, "EDUCREW_RESPONDER_MAX_ATTEMPTS")? {
            policy.max_attempts = n;
        }
        if let Some(d) = get_env_millis(env, "EDUCREW_RESPONDER_THROTTLE_BASE_MS")? {
            policy.throttle_base_ms = d.as_millis() as u64;
        }
        if let Some(d) = get_env_millis(env, "EDUCREW_RESPONDER_THROTTLE_CAP_MS")? {
            policy.throttle_cap_ms = d.as_millis() as u64;
        }
        if let Some(d) = get_env_millis(env, "EDUCREW_RESPONDER_FAILURE_STEP_MS")? {
            policy.failure_step_ms = d.as_millis() as u64;
        }
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.throttle_cap_ms < self.throttle_base_ms {
            return Err(ConfigError::ValidationError(format!(
                "throttle_cap_ms ({}) must not be below throttle_base_ms ({})",
                self.throttle_cap_ms, self.throttle_base_ms
            )));
        }
        Ok(())
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Wait after a throttled attempt: `min(base * 2^attempt, cap)`.
    ///
    /// A server-provided `Retry-After` longer than the computed wait wins,
    /// still bounded by the cap.
    pub fn throttle_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let backoff = self
            .throttle_base_ms
            .saturating_mul(factor)
            .min(self.throttle_cap_ms);
        let hinted = retry_after
            .map(|d| (d.as_millis() as u64).min(self.throttle_cap_ms))
            .unwrap_or(0);
        Duration::from_millis(backoff.max(hinted))
    }

    /// Wait after any other failed attempt: `step * attempt`.
    pub fn failure_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.failure_step_ms.saturating_mul(u64::from(attempt)))
    }

    /// Wait before retrying after `attempt` (1-based) failed with `err`.
    pub fn delay_for(&self, err: &ResponderError, attempt: u32) -> Duration {
        match err {
            ResponderError::Throttled { retry_after } => self.throttle_delay(attempt, *retry_after),
            ResponderError::Failed(_) => self.failure_delay(attempt),
        }
    }
}
