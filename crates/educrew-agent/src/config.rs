//! # Crew Configuration
//!
//! ## Environment Variables
//! - `EDUCREW_VERBOSE` - Log per-task lifecycle at info level (default: false)
//! - `EDUCREW_MAX_ITERATIONS` - Maximum tasks run by one workflow (default: 10)
//! - `EDUCREW_ENABLE_MEMORY` - Dispatch memory updates after successful tasks (default: true)
//! - `EDUCREW_FALLBACK_STRATEGY` - `graceful` or `strict` (default: graceful)
//! - `EDUCREW_TASK_TIMEOUT_MS` - Time budget of one agent invocation (default: 5000)
//! - `EDUCREW_HISTORY_CAPACITY` - Execution records retained (default: 100)
//! - `EDUCREW_MEMORY_RESULTS_PER_KIND` - Shared-memory results kept per task kind (default: 10)
//! - `EDUCREW_CONTEXT_RECENT_EXECUTIONS` - Records attached to each enriched task (default: 3)
//! - `EDUCREW_SELECTION_THRESHOLD` - Success rate an agent must exceed to be preferred (default: 0.7)

use educrew_core::ConfigError;
use educrew_core::env::{
    EnvLookup, ProcessEnv, get_env_bool, get_env_f64, get_env_millis, get_env_string,
    get_env_usize,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// What the orchestrator does with dispatch errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackStrategy {
    /// Convert errors into failed outcomes.
    #[default]
    Graceful,
    /// Return errors to the caller.
    Strict,
}

impl fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FallbackStrategy::Graceful => "graceful",
            FallbackStrategy::Strict => "strict",
        })
    }
}

impl FromStr for FallbackStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "graceful" => Ok(FallbackStrategy::Graceful),
            "strict" => Ok(FallbackStrategy::Strict),
            other => Err(format!(
                "invalid fallback strategy '{}', expected graceful or strict",
                other
            )),
        }
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewConfig {
    /// Logging only.
    pub verbose: bool,
    pub max_iterations: usize,
    pub enable_memory: bool,
    pub fallback_strategy: FallbackStrategy,
    pub task_timeout_ms: u64,
    pub history_capacity: usize,
    pub memory_results_per_kind: usize,
    pub context_recent_executions: usize,
    pub selection_threshold: f64,
}

impl Default for CrewConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            max_iterations: 10,
            enable_memory: true,
            fallback_strategy: FallbackStrategy::Graceful,
            task_timeout_ms: 5000,
            history_capacity: 100,
            memory_results_per_kind: 10,
            context_recent_executions: 3,
            selection_threshold: 0.7,
        }
    }
}

impl CrewConfig {
    /// Load overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any variable has an invalid value or the
    /// result fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&ProcessEnv)
    }

    pub fn from_lookup(env: &impl EnvLookup) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(verbose) = get_env_bool(env, "EDUCREW_VERBOSE")? {
            config.verbose = verbose;
        }
        if let Some(n) = get_env_usize(env, "EDUCREW_MAX_ITERATIONS")? {
            config.max_iterations = n;
        }
        if let Some(enable) = get_env_bool(env, "EDUCREW_ENABLE_MEMORY")? {
            config.enable_memory = enable;
        }
        if let Some(raw) = get_env_string(env, "EDUCREW_FALLBACK_STRATEGY") {
            config.fallback_strategy =
                raw.parse()
                    .map_err(|message| ConfigError::InvalidEnvVar {
                        key: "EDUCREW_FALLBACK_STRATEGY".to_string(),
                        message,
                    })?;
        }
        if let Some(timeout) = get_env_millis(env, "EDUCREW_TASK_TIMEOUT_MS")? {
            config.task_timeout_ms = timeout.as_millis() as u64;
        }
        if let Some(n) = get_env_usize(env, "EDUCREW_HISTORY_CAPACITY")? {
            config.history_capacity = n;
        }
        if let Some(n) = get_env_usize(env, "EDUCREW_MEMORY_RESULTS_PER_KIND")? {
            config.memory_results_per_kind = n;
        }
        if let Some(n) = get_env_usize(env, "EDUCREW_CONTEXT_RECENT_EXECUTIONS")? {
            config.context_recent_executions = n;
        }
        if let Some(threshold) = get_env_f64(env, "EDUCREW_SELECTION_THRESHOLD")? {
            config.selection_threshold = threshold;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|e| ConfigError::InvalidFile(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.task_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "task_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "history_capacity must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.selection_threshold) {
            return Err(ConfigError::ValidationError(format!(
                "selection_threshold must be within [0, 1], got {}",
                self.selection_threshold
            )));
        }
        Ok(())
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn with_fallback_strategy(mut self, strategy: FallbackStrategy) -> Self {
        self.fallback_strategy = strategy;
        self
    }

    pub fn with_enable_memory(mut self, enable: bool) -> Self {
        self.enable_memory = enable;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CrewConfig::default();
        assert!(!config.verbose);
        assert_eq!(config.max_iterations, 10);
        assert!(config.enable_memory);
        assert_eq!(config.fallback_strategy, FallbackStrategy::Graceful);
        assert_eq!(config.task_timeout(), Duration::from_secs(5));
        assert_eq!(config.selection_threshold, 0.7);
    }

    #[test]
    fn test_from_lookup() {
        let env = lookup(&[
            ("EDUCREW_FALLBACK_STRATEGY", "STRICT"),
            ("EDUCREW_ENABLE_MEMORY", "false"),
            ("EDUCREW_TASK_TIMEOUT_MS", "750"),
        ]);
        let config = CrewConfig::from_lookup(&env).unwrap();
        assert_eq!(config.fallback_strategy, FallbackStrategy::Strict);
        assert!(!config.enable_memory);
        assert_eq!(config.task_timeout(), Duration::from_millis(750));
    }

    #[test]
    fn test_invalid_strategy_names_the_variable() {
        let env = lookup(&[("EDUCREW_FALLBACK_STRATEGY", "panic")]);
        match CrewConfig::from_lookup(&env) {
            Err(ConfigError::InvalidEnvVar { key, .. }) => {
                assert_eq!(key, "EDUCREW_FALLBACK_STRATEGY")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_from_toml_keeps_defaults_for_missing_keys() {
        let config = CrewConfig::from_toml_str(
            r#"
            verbose = true
            fallback_strategy = "strict"
            "#,
        )
        .unwrap();
        assert!(config.verbose);
        assert_eq!(config.fallback_strategy, FallbackStrategy::Strict);
        assert_eq!(config.history_capacity, 100);

        assert!(matches!(
            CrewConfig::from_toml_str("selection_threshold = 2.0"),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            CrewConfig::from_toml_str("verbose = ["),
            Err(ConfigError::InvalidFile(_))
        ));
    }
}
