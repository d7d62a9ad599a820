//! Shared name → script table.
//!
//! A [`ScriptRegistry`] is a cheap `Clone` handle; the caller and the
//! loader hold the same table. Callers add and remove entries; only the
//! loader writes hashes back.

use std::collections::HashMap;
use std::sync::Arc;

use scriptcache_core::ScriptEntry;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default)]
pub struct ScriptRegistry {
    entries: Arc<RwLock<HashMap<String, ScriptEntry>>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `(name, source)` pairs.
    pub fn with_scripts<I, N, S>(scripts: I) -> Self
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let entries = scripts
            .into_iter()
            .map(|(name, source)| (name.into(), ScriptEntry::new(source)))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    /// Add or replace a script. A replaced entry loses its hash.
    pub async fn insert(&self, name: impl Into<String>, source: impl Into<String>) {
        self.insert_entry(name, ScriptEntry::new(source)).await;
    }

    pub async fn insert_entry(&self, name: impl Into<String>, entry: ScriptEntry) {
        self.entries.write().await.insert(name.into(), entry);
    }

    pub async fn remove(&self, name: &str) -> Option<ScriptEntry> {
        self.entries.write().await.remove(name)
    }

    pub async fn get(&self, name: &str) -> Option<ScriptEntry> {
        self.entries.read().await.get(name).cloned()
    }

    /// Current hash of `name`, if the entry exists and has one.
    pub async fn hash(&self, name: &str) -> Option<String> {
        self.entries
            .read()
            .await
            .get(name)
            .and_then(|e| e.hash().map(str::to_string))
    }

    /// All script names, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Point-in-time copy of every entry.
    pub async fn snapshot(&self) -> Vec<(String, ScriptEntry)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(name, entry)| (name.clone(), entry.clone()))
            .collect()
    }

    /// Record `hash` for `name`, but only while the entry still holds
    /// `source`. Returns whether the write happened.
    pub(crate) async fn set_hash(&self, name: &str, source: &str, hash: &str) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(name) {
            Some(entry) if entry.source() == source => {
                entry.set_hash(hash);
                true
            }
            _ => false,
        }
    }
}
