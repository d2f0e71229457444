//! In-memory translation cache keyed by (source text, target language).
//!
//! Unbounded by default; a capacity turns on LRU eviction. Every settled
//! write is broadcast so views can re-read their text.

use std::num::NonZeroUsize;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{AnuvadError, Result};
use crate::language::Language;

/// Identity of one translation unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    text: Arc<str>,
    language: Language,
}

impl CacheKey {
    pub fn new(text: &str, language: Language) -> Self {
        Self {
            text: Arc::from(text),
            language,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// A resolution is in flight; the value is still the source text
    Pending,
    /// The provider answered
    Resolved,
    /// The provider failed; the value is the fallback and is never retried
    Failed,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub value: String,
    pub state: EntryState,
    pub updated_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_settled(&self) -> bool {
        self.state != EntryState::Pending
    }
}

/// Narrow read/write surface of the cache.
///
/// The translators only talk to the cache through this trait, so tests can
/// hand them an instrumented store.
pub trait TranslationStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry>;

    /// Write a settled value and notify subscribers.
    fn put(&self, key: CacheKey, value: String, state: EntryState);

    /// Record that a resolution for `key` has started.
    fn mark_pending(&self, key: &CacheKey);

    /// Drop a pending entry whose resolution was abandoned. Settled entries are kept.
    fn discard_pending(&self, key: &CacheKey);

    fn subscribe(&self) -> broadcast::Receiver<CacheKey>;

    /// Settled value for `key`, if any.
    fn lookup(&self, key: &CacheKey) -> Option<String> {
        self.get(key)
            .filter(CacheEntry::is_settled)
            .map(|entry| entry.value)
    }
}

pub struct TranslationCache {
    inner: Mutex<LruCache<CacheKey, CacheEntry>>,
    resolved_tx: broadcast::Sender<CacheKey>,
    capacity: Option<usize>,
    notify_capacity: usize,
}

static GLOBAL: OnceLock<Arc<TranslationCache>> = OnceLock::new();

impl TranslationCache {
    pub fn new(capacity: Option<usize>, notify_capacity: usize) -> Self {
        let inner = match capacity.and_then(NonZeroUsize::new) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        let (resolved_tx, _) = broadcast::channel(notify_capacity.max(1));
        Self {
            inner: Mutex::new(inner),
            resolved_tx,
            capacity,
            notify_capacity,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None, 256)
    }

    /// The session-wide cache, created from the first settings that ask for it.
    ///
    /// Asking again with different settings is an error: the existing cache
    /// cannot be resized.
    pub fn global(capacity: Option<usize>, notify_capacity: usize) -> Result<Arc<TranslationCache>> {
        let cache = GLOBAL.get_or_init(|| {
            debug!(?capacity, notify_capacity, "Creating global translation cache");
            Arc::new(TranslationCache::new(capacity, notify_capacity))
        });
        if cache.capacity != capacity || cache.notify_capacity != notify_capacity {
            return Err(AnuvadError::Config(format!(
                "global cache already exists with capacity {:?} and notify capacity {}",
                cache.capacity, cache.notify_capacity
            )));
        }
        Ok(Arc::clone(cache))
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget everything, including negative entries.
    pub fn clear(&self) {
        self.inner.lock().clear();
        debug!("Translation cache cleared");
    }

    /// Copy of all entries, most recently used first.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        self.inner.lock().iter().map(|(_, entry)| entry.clone()).collect()
    }
}

impl TranslationStore for TranslationCache {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.lock().get(key).cloned()
    }

    fn put(&self, key: CacheKey, value: String, state: EntryState) {
        debug!(language = %key.language(), ?state, "Caching translation for {:?}", key.text());
        {
            let mut cache = self.inner.lock();
            cache.put(
                key.clone(),
                CacheEntry {
                    key: key.clone(),
                    value,
                    state,
                    updated_at: Utc::now(),
                },
            );
        }
        if state != EntryState::Pending {
            // No receivers is fine.
            let _ = self.resolved_tx.send(key);
        }
    }

    fn mark_pending(&self, key: &CacheKey) {
        let mut cache = self.inner.lock();
        if cache.peek(key).is_none() {
            cache.put(
                key.clone(),
                CacheEntry {
                    key: key.clone(),
                    value: key.text().to_string(),
                    state: EntryState::Pending,
                    updated_at: Utc::now(),
                },
            );
        }
    }

    fn discard_pending(&self, key: &CacheKey) {
        let mut cache = self.inner.lock();
        if matches!(cache.peek(key), Some(entry) if entry.state == EntryState::Pending) {
            cache.pop(key);
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<CacheKey> {
        self.resolved_tx.subscribe()
    }
}
