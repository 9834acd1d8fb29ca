//! Engine configuration.
//!
//! Durations are written in (fractional) seconds in JSON:
//!
//! ```json
//! { "cache": { "idle_ttl_secs": 3600, "refresh_after_secs": 600 }, "max_predicates": 12 }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Evict an entry that has not been read for this long.
    #[serde(rename = "idle_ttl_secs", with = "secs")]
    pub idle_ttl: Duration,
    /// Recompute an entry in the background once it is this old.
    #[serde(rename = "refresh_after_secs", with = "secs")]
    pub refresh_after: Duration,
    /// Upper bound on cached bitmaps (unbounded when absent).
    pub max_capacity: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(60 * 60),
            refresh_after: Duration::from_secs(10 * 60),
            max_capacity: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    /// Distinct predicates allowed in one query. Tabulation work grows roughly
    /// threefold with every predicate; 12 keeps a worst-case disjunction in
    /// the low hundreds of milliseconds.
    pub max_predicates: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            max_predicates: 12,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        Ok(Self::from_json_str(&text)?)
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
