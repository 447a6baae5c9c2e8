//! In-memory response cache
//!
//! Entries are keyed by an MD5 fingerprint of `(method, endpoint, body)` and
//! expire after a fixed time-to-live. Expired entries are never removed, they
//! are simply overwritten by the next successful fetch for the same key.

use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default time-to-live for cached portal results
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cached portal result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub timestamp: Instant,
    pub payload: Value,
}

/// Serialize a JSON value with object keys sorted at every level
fn canonical_json(value: &Value) -> String {
    fn canonicalize(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                Value::Object(
                    keys.into_iter()
                        .map(|key| (key.clone(), canonicalize(&map[key])))
                        .collect(),
                )
            }
            Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
            other => other.clone(),
        }
    }

    canonicalize(value).to_string()
}

/// Derive the cache key for a request
///
/// Identical `(method, endpoint, body)` tuples always produce the same key,
/// regardless of the key order inside `body`. An empty or missing body
/// contributes nothing.
pub fn cache_key(method: &str, endpoint: &str, body: Option<&Value>) -> String {
    let body = body
        .filter(|b| crate::package::is_truthy(b))
        .map(canonical_json)
        .unwrap_or_default();

    format!(
        "{:x}",
        md5::compute(format!("{method}:{endpoint}:{body}").as_bytes())
    )
}

/// Key to entry mapping with a fixed time-to-live
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// An entry is valid while `now - timestamp < ttl`
    pub fn is_valid(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.timestamp) < self.ttl
    }

    /// Payload for `key` if it exists and has not expired
    pub fn get_valid(&self, key: &str, now: Instant) -> Option<&Value> {
        self.get(key)
            .filter(|entry| self.is_valid(entry, now))
            .map(|entry| &entry.payload)
    }

    /// Store `payload` under `key`, replacing any previous entry
    pub fn put(&mut self, key: String, payload: Value, now: Instant) {
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                timestamp: now,
                payload,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
