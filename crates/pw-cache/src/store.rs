//! Cache store: fail-safe load, selective merge, atomic persist.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use pw_core::{CacheKey, Directive, GenerationResult};

/// Directive-result cache.
///
/// Entries accumulate across generation runs: merging touches only the keys
/// being updated, and nothing is evicted unless [`Cache::retain`] is called
/// explicitly. Stale entries for abandoned prompts are harmless; the
/// injector only ever looks up keys derived from current source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cache {
    entries: BTreeMap<String, BTreeMap<String, GenerationResult>>,
}

impl Cache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache from `path`.
    ///
    /// Absent or unparseable files yield an empty cache; any previously
    /// valid but now-unreadable data is discarded. Corruption is logged,
    /// never surfaced.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no cache file, starting empty");
                return Self::new();
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "cache unreadable, starting empty");
                return Self::new();
            }
        };
        match serde_json::from_str(&text) {
            Ok(cache) => cache,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "cache corrupt, starting empty");
                Self::new()
            }
        }
    }

    /// Look up the result for a directive key and prompt.
    pub fn lookup(&self, key: &CacheKey, prompt: &str) -> Option<&GenerationResult> {
        self.entries.get(key.as_str())?.get(prompt)
    }

    /// Whether a directive already has a result.
    pub fn contains(&self, directive: &Directive) -> bool {
        self.lookup(&directive.cache_key(), &directive.prompt).is_some()
    }

    /// Write one result at `(key, prompt)`, replacing any previous value for
    /// that exact pair and leaving every other entry untouched.
    pub fn insert(&mut self, key: CacheKey, prompt: impl Into<String>, result: GenerationResult) {
        self.entries
            .entry(key.as_str().to_string())
            .or_default()
            .insert(prompt.into(), result);
    }

    /// Merge a batch of successful generations.
    ///
    /// Failed generations must not appear here: leaving no entry is what
    /// makes the next generation run treat the directive as not yet
    /// attempted and retry it.
    pub fn merge(&mut self, updates: Vec<(Directive, GenerationResult)>) {
        for (directive, result) in updates {
            self.insert(directive.cache_key(), directive.prompt, result);
        }
    }

    /// Explicit prune: keep only the `(key, prompt)` pairs present in
    /// `live`, dropping everything else.
    ///
    /// Only safe when `live` was derived from a scan of the full file set
    /// sharing this cache; never invoked implicitly.
    pub fn retain(&mut self, live: &BTreeSet<(CacheKey, String)>) {
        let before = self.len();
        for (key, prompts) in self.entries.iter_mut() {
            let key = CacheKey::from_hex(key.clone());
            prompts.retain(|prompt, _| live.contains(&(key.clone(), prompt.clone())));
        }
        self.entries.retain(|_, prompts| !prompts.is_empty());
        let dropped = before - self.len();
        if dropped > 0 {
            tracing::info!(dropped, "pruned stale cache entries");
        }
    }

    /// Persist the full cache to `path` in one atomic write.
    ///
    /// The JSON is written to a sibling temporary file and renamed into
    /// place, so a racing reader sees either the old or the new cache,
    /// never a torn one.
    pub fn persist(&self, path: &Path) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        let tmp = match dir {
            Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
            None => tempfile::NamedTempFile::new_in(".")?,
        };
        std::fs::write(tmp.path(), json.as_bytes())?;
        tmp.persist(path).map_err(|err| err.error)?;
        tracing::debug!(path = %path.display(), entries = self.len(), "cache persisted");
        Ok(())
    }

    /// Total number of `(key, prompt)` entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache persistence failure. Reads never fail; only writes do.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache could not be serialized.
    #[error("failed to encode cache: {0}")]
    Encode(#[from] serde_json::Error),

    /// The temporary file or rename failed.
    #[error("failed to write cache: {0}")]
    Io(#[from] std::io::Error),
}
