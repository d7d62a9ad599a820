//! A single managed script and its source validation.

use crate::error::CoreError;

/// One script tracked for presence on the store.
///
/// `source` is fixed once supplied. `hash` is absent until a loader
/// computes it or the store confirms it; a computed-but-unconfirmed
/// hash is indistinguishable here, so callers wanting certainty should
/// consult the latest load report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    source: String,
    hash: Option<String>,
}

impl ScriptEntry {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            hash: None,
        }
    }

    /// Start from a hash the caller already knows (e.g. from a previous run).
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The known hash, treating an empty string as unknown.
    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref().filter(|h| !h.is_empty())
    }

    pub fn set_hash(&mut self, hash: impl Into<String>) {
        self.hash = Some(hash.into());
    }
}

/// Check that a script body can be sent to the store at all.
///
/// Only an empty body is rejected locally. Anything else, whitespace
/// included, is the store's call; syntax errors surface as a rejected
/// upload.
pub fn validate_source(name: &str, source: &str) -> Result<(), CoreError> {
    if source.is_empty() {
        return Err(CoreError::InvalidScript {
            name: name.to_string(),
            reason: "source is empty",
        });
    }
    Ok(())
}
