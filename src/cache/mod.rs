mod file;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScriptError};

pub use file::FileCache;

/// A generated script stored under its topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub topic: String,
    /// `complete_script` exactly as the model returned it
    pub raw_text: String,
    /// Script after validation, repair and pacing
    pub validated_text: String,
    /// Seconds since the Unix epoch
    pub created_at: u64,
}

impl CacheEntry {
    pub fn new(topic: &str, raw_text: &str, validated_text: &str) -> Self {
        Self {
            topic: topic.to_string(),
            raw_text: raw_text.to_string(),
            validated_text: validated_text.to_string(),
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }
}

/// Key-value store of scripts keyed by the exact topic string.
pub trait CacheStore {
    fn lookup(&self, topic: &str) -> impl Future<Output = Result<Option<CacheEntry>>> + Send;

    fn store(
        &self,
        topic: &str,
        raw_text: &str,
        validated_text: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Process-lifetime store; entries are never evicted.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> ScriptError {
    ScriptError::Cache("memory cache lock poisoned".to_string())
}

impl CacheStore for MemoryCache {
    async fn lookup(&self, topic: &str) -> Result<Option<CacheEntry>> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries.get(topic).cloned())
    }

    async fn store(&self, topic: &str, raw_text: &str, validated_text: &str) -> Result<()> {
        let entry = CacheEntry::new(topic, raw_text, validated_text);
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.insert(topic.to_string(), entry);
        Ok(())
    }
}
