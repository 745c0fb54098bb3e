//! Environment Configuration Helpers

use std::env;
use std::str::FromStr;

/// Error reading a configuration value from the environment
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnvError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

/// Read `key`, falling back to `default` when unset or empty
pub fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Read and parse `key`, falling back to `default` when unset or empty
pub fn env_parse_or<T: FromStr>(key: &str, default: T) -> Result<T, EnvError> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.trim().parse().map_err(|_| EnvError::Invalid {
            key: key.to_string(),
            value: v,
        }),
        _ => Ok(default),
    }
}

/// Split a comma-separated list, dropping empty items
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
