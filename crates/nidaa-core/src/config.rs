//! Process-level configuration.
//!
//! Runtime application settings (center name, audio mode, ...) live in the
//! shared document. This covers what must be known before the store opens.
//!
//! Environment variables:
//! - `NIDAA_DB_PATH`: database file, in-memory when unset
//! - `NIDAA_LOCKOUT_MINUTES`: lockout duration, default 15
//! - `NIDAA_MAX_ATTEMPTS`: failures before lockout, default 3
//! - `NIDAA_LOG_CAPACITY`: activity log entries kept, default 1000

use std::path::PathBuf;

use thiserror::Error;

use crate::lockout::LockoutPolicy;
use crate::models::LOG_CAPACITY;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    /// `None` for an in-memory store
    pub db_path: Option<PathBuf>,
    pub lockout: LockoutPolicy,
    pub log_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            lockout: LockoutPolicy::default(),
            log_capacity: LOG_CAPACITY,
        }
    }
}

impl CoreConfig {
    /// Build from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("NIDAA_DB_PATH").filter(|p| !p.trim().is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(minutes) = parse_positive(&lookup, "NIDAA_LOCKOUT_MINUTES")? {
            config.lockout.duration_ms = minutes as i64 * 60_000;
        }
        if let Some(attempts) = parse_positive(&lookup, "NIDAA_MAX_ATTEMPTS")? {
            config.lockout.max_attempts = attempts as u32;
        }
        if let Some(capacity) = parse_positive(&lookup, "NIDAA_LOG_CAPACITY")? {
            config.log_capacity = capacity as usize;
        }

        Ok(config)
    }
}

fn parse_positive<F>(lookup: &F, key: &'static str) -> Result<Option<u32>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::InvalidValue { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = CoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.lockout.max_attempts, 3);
        assert_eq!(config.lockout.duration_ms, 900_000);
    }

    #[test]
    fn test_overrides() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            ("NIDAA_DB_PATH", "/var/lib/nidaa/queue.db"),
            ("NIDAA_LOCKOUT_MINUTES", "5"),
            ("NIDAA_MAX_ATTEMPTS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/var/lib/nidaa/queue.db")));
        assert_eq!(config.lockout.duration_ms, 300_000);
        assert_eq!(config.lockout.max_attempts, 4);
        assert_eq!(config.log_capacity, LOG_CAPACITY);
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = CoreConfig::from_lookup(lookup_from(&[("NIDAA_MAX_ATTEMPTS", "zero")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "NIDAA_MAX_ATTEMPTS",
                value: "zero".into()
            }
        );
        assert!(CoreConfig::from_lookup(lookup_from(&[("NIDAA_LOG_CAPACITY", "0")])).is_err());
    }
}
