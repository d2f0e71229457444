use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{CacheKey, EntryState, TranslationStore};
use crate::dictionary::OfflineDictionary;
use crate::error::AnuvadError;
use crate::inflight::{Flight, FlightGuard, InFlightRegistry};
use crate::language::Language;
use crate::provider::{TranslateRequest, TranslationProvider};

/// Translates one text unit at a time.
///
/// Never fails: provider errors and timeouts degrade to an offline
/// substitution or the original text, and that fallback is cached so the
/// same key is not retried for the rest of the session.
pub struct SingleTranslator {
    store: Arc<dyn TranslationStore>,
    flights: Arc<InFlightRegistry>,
    provider: Arc<dyn TranslationProvider>,
    dictionary: Arc<OfflineDictionary>,
    timeout: Duration,
    offline_max_tokens: usize,
}

impl SingleTranslator {
    pub fn new(
        store: Arc<dyn TranslationStore>,
        flights: Arc<InFlightRegistry>,
        provider: Arc<dyn TranslationProvider>,
        dictionary: Arc<OfflineDictionary>,
        timeout: Duration,
        offline_max_tokens: usize,
    ) -> Self {
        Self {
            store,
            flights,
            provider,
            dictionary,
            timeout,
            offline_max_tokens,
        }
    }

    pub fn store(&self) -> &Arc<dyn TranslationStore> {
        &self.store
    }

    pub fn flights(&self) -> &Arc<InFlightRegistry> {
        &self.flights
    }

    pub fn provider(&self) -> &Arc<dyn TranslationProvider> {
        &self.provider
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cached value or `text`, without any I/O.
    pub fn lookup_sync(&self, text: &str, language: Language) -> String {
        if language.is_identity() || text.trim().is_empty() {
            return text.to_string();
        }
        self.store
            .lookup(&CacheKey::new(text, language))
            .unwrap_or_else(|| text.to_string())
    }

    pub async fn translate(&self, text: &str, language: Language) -> String {
        if language.is_identity() || text.trim().is_empty() {
            return text.to_string();
        }

        let key = CacheKey::new(text, language);
        if let Some(hit) = self.store.lookup(&key) {
            debug!(%language, "Cache hit for {:?}", text);
            return hit;
        }

        match self.flights.begin(key, &self.store) {
            Flight::Follower(waiter) => {
                debug!(%language, "Joining in-flight translation of {:?}", text);
                waiter.wait().await.unwrap_or_else(|| text.to_string())
            }
            Flight::Leader(guard) => self.resolve(guard).await,
        }
    }

    /// Resolve a key this caller leads: one remote call, then cache and release.
    pub(crate) async fn resolve(&self, guard: FlightGuard) -> String {
        let key = guard.key().clone();

        // Another leader may have settled the key between our miss and `begin`.
        if let Some(hit) = self.store.lookup(&key) {
            guard.complete(&hit);
            return hit;
        }

        let request = TranslateRequest {
            text: key.text().to_string(),
            source_language: Language::SOURCE,
            target_language: key.language(),
        };

        let outcome = tokio::time::timeout(self.timeout, self.provider.translate(request))
            .await
            .unwrap_or_else(|_| Err(AnuvadError::Timeout(self.timeout.as_millis() as u64)));
        let (value, state) = match outcome {
            Ok(translated) if !translated.trim().is_empty() => (translated, EntryState::Resolved),
            Ok(_) => {
                warn!(language = %key.language(), "Empty translation received for {:?}", key.text());
                (self.fallback(&key), EntryState::Failed)
            }
            Err(e) => {
                warn!(language = %key.language(), "Translation of {:?} failed: {}", key.text(), e);
                (self.fallback(&key), EntryState::Failed)
            }
        };

        self.store.put(key, value.clone(), state);
        guard.complete(&value);
        value
    }

    fn fallback(&self, key: &CacheKey) -> String {
        self.dictionary
            .substitute(key.text(), key.language(), self.offline_max_tokens)
            .unwrap_or_else(|| key.text().to_string())
    }
}
