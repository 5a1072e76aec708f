//! # Environment-Based Configuration Helpers
//!
//! Typed readers for `EDUCREW_*` style variables. Each reader takes a lookup
//! function instead of touching the process environment directly, so config
//! builders can be exercised in tests with a plain map.

use std::time::Duration;

/// Error type for configuration loading
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid environment variable '{key}': {message}")]
    InvalidEnvVar { key: String, message: String },

    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for crate::error::CrewError {
    fn from(err: ConfigError) -> Self {
        crate::error::CrewError::Config(err.to_string())
    }
}

/// Source of raw variable values.
pub trait EnvLookup {
    fn lookup(&self, key: &str) -> Option<String>;
}

impl<F> EnvLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Reads the real process environment.
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

pub fn get_env_string(env: &impl EnvLookup, key: &str) -> Option<String> {
    env.lookup(key).filter(|v| !v.trim().is_empty())
}

pub fn get_env_bool(env: &impl EnvLookup, key: &str) -> Result<Option<bool>, ConfigError> {
    match env.lookup(key) {
        Some(val) => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!(
                    "invalid boolean value '{val}', expected true/false/1/0/yes/no/on/off"
                ),
            }),
        },
        None => Ok(None),
    }
}

pub fn get_env_u32(env: &impl EnvLookup, key: &str) -> Result<Option<u32>, ConfigError> {
    match env.lookup(key) {
        Some(val) => val
            .parse::<u32>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid u32 value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

pub fn get_env_usize(env: &impl EnvLookup, key: &str) -> Result<Option<usize>, ConfigError> {
    match env.lookup(key) {
        Some(val) => val
            .parse::<usize>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid usize value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

pub fn get_env_f64(env: &impl EnvLookup, key: &str) -> Result<Option<f64>, ConfigError> {
    match env.lookup(key) {
        Some(val) => val
            .parse::<f64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid f64 value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

/// Durations are given in whole milliseconds.
pub fn get_env_millis(env: &impl EnvLookup, key: &str) -> Result<Option<Duration>, ConfigError> {
    match env.lookup(key) {
        Some(val) => val
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|e| ConfigError::InvalidEnvVar {
                key: key.to_string(),
                message: format!("invalid millisecond value '{val}': {e}"),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_bool_parsing() {
        let env = vars(&[("A", "yes"), ("B", "off"), ("C", "maybe")]);
        assert_eq!(get_env_bool(&env, "A").unwrap(), Some(true));
        assert_eq!(get_env_bool(&env, "B").unwrap(), Some(false));
        assert_eq!(get_env_bool(&env, "MISSING").unwrap(), None);
        assert!(matches!(
            get_env_bool(&env, "C"),
            Err(ConfigError::InvalidEnvVar { .. })
        ));
    }

    #[test]
    fn test_millis_parsing() {
        let env = vars(&[("T", "2500"), ("BAD", "2s")]);
        assert_eq!(
            get_env_millis(&env, "T").unwrap(),
            Some(Duration::from_millis(2500))
        );
        assert!(get_env_millis(&env, "BAD").is_err());
    }

    #[test]
    fn test_blank_string_is_absent() {
        let env = vars(&[("S", "  ")]);
        assert_eq!(get_env_string(&env, "S"), None);
    }
}
