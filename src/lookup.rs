//! View-facing lookup: answers synchronously, translates in the background.
//!
//! A miss returns the original text right away and schedules a debounced
//! translation. When it lands, the cache broadcasts the key and any
//! [`TextWatch`] for that text yields the new value.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::CacheKey;
use crate::config::LookupConfig;
use crate::language::Language;
use crate::translator::SingleTranslator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupState {
    pub text: String,
    /// A translation is on its way and the text is long enough to show it
    pub loading: bool,
}

struct PendingTimer {
    generation: u64,
    token: CancellationToken,
}

pub struct ReactiveLookup {
    translator: Arc<SingleTranslator>,
    language: watch::Receiver<Language>,
    runtime: Handle,
    debounce: Duration,
    min_loading_chars: usize,
    timers: Arc<Mutex<HashMap<CacheKey, PendingTimer>>>,
    generation: AtomicU64,
    attempts: Arc<AtomicUsize>,
}

impl ReactiveLookup {
    pub fn new(
        translator: Arc<SingleTranslator>,
        language: watch::Receiver<Language>,
        runtime: Handle,
        config: &LookupConfig,
    ) -> Self {
        Self {
            translator,
            language,
            runtime,
            debounce: config.debounce(),
            min_loading_chars: config.min_loading_chars,
            timers: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn language(&self) -> Language {
        *self.language.borrow()
    }

    /// Cached translation for the active language, else `text`. No I/O.
    pub fn lookup_sync(&self, text: &str) -> String {
        self.translator.lookup_sync(text, self.language())
    }

    /// Current best value, scheduling a translation on a miss.
    pub fn lookup(&self, text: &str) -> LookupState {
        let language = self.language();
        if language.is_identity() || text.trim().is_empty() {
            return LookupState {
                text: text.to_string(),
                loading: false,
            };
        }

        let key = CacheKey::new(text, language);
        if let Some(hit) = self.translator.store().lookup(&key) {
            return LookupState {
                text: hit,
                loading: false,
            };
        }

        self.schedule(key);
        LookupState {
            text: text.to_string(),
            loading: text.chars().count() >= self.min_loading_chars,
        }
    }

    /// Ask for `text` to be translated once requests for it go quiet.
    pub fn request(&self, text: &str) {
        let _ = self.lookup(text);
    }

    fn schedule(&self, key: CacheKey) {
        if self.translator.flights().contains(&key) {
            return;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        {
            let mut timers = self.timers.lock();
            let replaced = timers.insert(
                key.clone(),
                PendingTimer {
                    generation,
                    token: token.clone(),
                },
            );
            if let Some(previous) = replaced {
                previous.token.cancel();
            }
        }

        let timers = Arc::clone(&self.timers);
        let translator = Arc::clone(&self.translator);
        let attempts = Arc::clone(&self.attempts);
        let delay = self.debounce;
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            {
                let mut timers = timers.lock();
                match timers.get(&key) {
                    Some(timer) if timer.generation == generation => {
                        timers.remove(&key);
                    }
                    _ => return,
                }
            }

            attempts.fetch_add(1, Ordering::SeqCst);
            debug!(language = %key.language(), "Debounce elapsed for {:?}", key.text());
            translator.translate(key.text(), key.language()).await;
        });
    }

    /// Timers still waiting for their quiet period.
    pub fn pending_timers(&self) -> usize {
        self.timers.lock().len()
    }

    /// Debounced translations that actually started.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Every key that settles in the cache.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheKey> {
        self.translator.store().subscribe()
    }

    /// Follow the displayed value of one text across translations and language switches.
    pub fn watch(&self, text: &str) -> TextWatch {
        TextWatch {
            text: text.to_string(),
            translator: Arc::clone(&self.translator),
            language: self.language.clone(),
            resolved: self.subscribe(),
        }
    }
}

impl Drop for ReactiveLookup {
    fn drop(&mut self) {
        for (_, timer) in self.timers.lock().drain() {
            timer.token.cancel();
        }
    }
}

pub struct TextWatch {
    text: String,
    translator: Arc<SingleTranslator>,
    language: watch::Receiver<Language>,
    resolved: broadcast::Receiver<CacheKey>,
}

enum WatchEvent {
    Resolved(Result<CacheKey, RecvError>),
    LanguageChanged(bool),
}

impl TextWatch {
    pub fn current(&self) -> String {
        self.translator.lookup_sync(&self.text, *self.language.borrow())
    }

    /// Wait for the next change that may affect this text and return the new value.
    /// `None` once the engine is gone.
    pub async fn changed(&mut self) -> Option<String> {
        loop {
            let event = tokio::select! {
                res = self.resolved.recv() => WatchEvent::Resolved(res),
                res = self.language.changed() => WatchEvent::LanguageChanged(res.is_ok()),
            };

            match event {
                WatchEvent::Resolved(Ok(key)) => {
                    if key.text() == self.text && key.language() == *self.language.borrow() {
                        return Some(self.current());
                    }
                }
                // Missed notifications may include ours.
                WatchEvent::Resolved(Err(RecvError::Lagged(_))) => return Some(self.current()),
                WatchEvent::Resolved(Err(RecvError::Closed)) => return None,
                WatchEvent::LanguageChanged(true) => return Some(self.current()),
                WatchEvent::LanguageChanged(false) => return None,
            }
        }
    }
}
