//! Runtime configuration from environment variables.
//!
//! | Variable                 | Default | Meaning                                      |
//! |--------------------------|---------|----------------------------------------------|
//! | `BAZAAR_LOG_FORMAT`      | `json`  | `json` or `pretty`                           |
//! | `BAZAAR_FEED_TIMEOUT_MS` | unset   | first-snapshot timeout per source feed       |
//! | `BAZAAR_SEED_DEMO`       | `true`  | seed demo data in the simulation binary      |

use std::time::Duration;

use thiserror::Error;

use bazaar_observability::LogFormat;

pub const LOG_FORMAT_VAR: &str = "BAZAAR_LOG_FORMAT";
pub const FEED_TIMEOUT_VAR: &str = "BAZAAR_FEED_TIMEOUT_MS";
pub const SEED_DEMO_VAR: &str = "BAZAAR_SEED_DEMO";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}='{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BazaarConfig {
    pub log_format: LogFormat,
    /// `None` waits for the first snapshot indefinitely.
    pub feed_timeout: Option<Duration>,
    pub seed_demo: bool,
}

impl Default for BazaarConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            feed_timeout: None,
            seed_demo: true,
        }
    }
}

impl BazaarConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = get(LOG_FORMAT_VAR) {
            config.log_format = value.parse().map_err(|err| ConfigError::Invalid {
                key: LOG_FORMAT_VAR,
                value: value.clone(),
                reason: format!("{err}"),
            })?;
        }

        if let Some(value) = get(FEED_TIMEOUT_VAR) {
            let millis: u64 = value.trim().parse().map_err(|_| ConfigError::Invalid {
                key: FEED_TIMEOUT_VAR,
                value: value.clone(),
                reason: "expected a number of milliseconds".to_string(),
            })?;
            config.feed_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }

        if let Some(value) = get(SEED_DEMO_VAR) {
            config.seed_demo = parse_bool(&value).ok_or_else(|| ConfigError::Invalid {
                key: SEED_DEMO_VAR,
                value: value.clone(),
                reason: "expected true or false".to_string(),
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = BazaarConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, BazaarConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = BazaarConfig::from_lookup(lookup(&[
            (LOG_FORMAT_VAR, "pretty"),
            (FEED_TIMEOUT_VAR, "1500"),
            (SEED_DEMO_VAR, "no"),
        ]))
        .unwrap();

        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.feed_timeout, Some(Duration::from_millis(1500)));
        assert!(!config.seed_demo);
    }

    #[test]
    fn zero_timeout_means_wait_forever() {
        let config = BazaarConfig::from_lookup(lookup(&[(FEED_TIMEOUT_VAR, "0")])).unwrap();
        assert_eq!(config.feed_timeout, None);
    }

    #[test]
    fn rejects_garbage() {
        let err = BazaarConfig::from_lookup(lookup(&[(FEED_TIMEOUT_VAR, "soon")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid BAZAAR_FEED_TIMEOUT_MS='soon': expected a number of milliseconds"
        );

        let err = BazaarConfig::from_lookup(lookup(&[(LOG_FORMAT_VAR, "xml")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: LOG_FORMAT_VAR, .. }));
    }
}
