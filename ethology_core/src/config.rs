//! Engine configuration.
//!
//! Every field has a default, so a JSON file only needs to name the values it
//! overrides. Durations are given in milliseconds.

use crate::error::EthologyError;
use ethology_env::AgentTypeKey;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-requester token bucket parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub capacity: u32,
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            refill_per_sec: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Agent types never analyzed (raw keys, `minecraft` namespace implied)
    pub deny_list: Vec<String>,
    /// Emit the catalog's "unknown" trait for units nothing classifies
    pub debug_unknown_units: bool,
    pub rate_limit: RateLimitConfig,
    #[serde(rename = "instance_freshness_ms", with = "millis")]
    pub instance_freshness: Duration,
    pub worker_threads: usize,
    #[serde(rename = "debounce_ms", with = "millis")]
    pub debounce: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deny_list: Vec::new(),
            debug_unknown_units: false,
            rate_limit: RateLimitConfig::default(),
            instance_freshness: Duration::from_secs(5),
            worker_threads: default_worker_threads(),
            debounce: Duration::from_millis(300),
        }
    }
}

/// Half the available cores, at least one.
fn default_worker_threads() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores / 2).max(1)
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, EthologyError> {
        serde_json::from_str(json).map_err(|e| EthologyError::Config(e.to_string()))
    }

    pub fn with_deny_list<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny_list = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_debug_unknown_units(mut self, enabled: bool) -> Self {
        self.debug_unknown_units = enabled;
        self
    }

    pub fn with_rate_limit(mut self, capacity: u32, refill_per_sec: f64) -> Self {
        self.rate_limit = RateLimitConfig {
            capacity,
            refill_per_sec,
        };
        self
    }

    pub fn with_instance_freshness(mut self, window: Duration) -> Self {
        self.instance_freshness = window;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    pub fn with_debounce(mut self, quiet: Duration) -> Self {
        self.debounce = quiet;
        self
    }

    pub fn is_denied(&self, key: &AgentTypeKey) -> bool {
        self.deny_list
            .iter()
            .any(|raw| AgentTypeKey::parse(raw) == *key)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.rate_limit.capacity, 10);
        assert_eq!(config.rate_limit.refill_per_sec, 2.0);
        assert_eq!(config.instance_freshness, Duration::from_secs(5));
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert!(config.worker_threads >= 1);
        assert!(!config.debug_unknown_units);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(
            r#"{ "deny_list": ["ender_dragon"], "rate_limit": { "capacity": 3 }, "debounce_ms": 50 }"#,
        )
        .expect("valid config");

        assert!(config.is_denied(&AgentTypeKey::parse("minecraft:ender_dragon")));
        assert!(!config.is_denied(&AgentTypeKey::parse("cow")));
        assert_eq!(config.rate_limit.capacity, 3);
        assert_eq!(config.rate_limit.refill_per_sec, 2.0);
        assert_eq!(config.debounce, Duration::from_millis(50));
        assert_eq!(config.instance_freshness, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(
            EngineConfig::from_json("[1, 2]"),
            Err(EthologyError::Config(_))
        ));
    }
}
