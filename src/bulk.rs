use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, EntryState};
use crate::config::BulkFailurePolicy;
use crate::error::AnuvadError;
use crate::inflight::{Flight, FlightGuard};
use crate::language::Language;
use crate::provider::BulkTranslateRequest;
use crate::translator::SingleTranslator;

/// Translates many texts with at most one remote call per pass.
pub struct BulkTranslator {
    single: Arc<SingleTranslator>,
    on_failure: BulkFailurePolicy,
}

/// Where each text of a pass came from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BulkStats {
    pub cached: usize,
    pub joined: usize,
    pub requested: usize,
    pub failed: usize,
}

impl BulkTranslator {
    pub fn new(single: Arc<SingleTranslator>, on_failure: BulkFailurePolicy) -> Self {
        Self { single, on_failure }
    }

    /// Map every input text to its translation, cached value or itself.
    pub async fn translate<S: AsRef<str>>(&self, texts: &[S], language: Language) -> HashMap<String, String> {
        self.translate_with_stats(texts, language).await.0
    }

    pub async fn translate_with_stats<S: AsRef<str>>(
        &self,
        texts: &[S],
        language: Language,
    ) -> (HashMap<String, String>, BulkStats) {
        let mut results = HashMap::with_capacity(texts.len());
        let mut stats = BulkStats::default();

        if language.is_identity() {
            for text in texts {
                let text = text.as_ref();
                results.insert(text.to_string(), text.to_string());
            }
            return (results, stats);
        }

        let store = self.single.store();
        let mut seen = HashSet::new();
        let mut leading: Vec<FlightGuard> = Vec::new();
        let mut joining = Vec::new();

        for text in texts {
            let text = text.as_ref();
            if !seen.insert(text) {
                continue;
            }
            if text.trim().is_empty() {
                results.insert(text.to_string(), text.to_string());
                continue;
            }

            let key = CacheKey::new(text, language);
            if let Some(hit) = store.lookup(&key) {
                stats.cached += 1;
                results.insert(text.to_string(), hit);
                continue;
            }

            match self.single.flights().begin(key, store) {
                Flight::Leader(guard) => leading.push(guard),
                Flight::Follower(waiter) => joining.push((text.to_string(), waiter)),
            }
        }

        // Keys settled by someone else between our miss and `begin`.
        let mut requested = Vec::with_capacity(leading.len());
        for guard in leading {
            match store.lookup(guard.key()) {
                Some(hit) => {
                    stats.cached += 1;
                    results.insert(guard.key().text().to_string(), hit.clone());
                    guard.complete(&hit);
                }
                None => requested.push(guard),
            }
        }

        if !requested.is_empty() {
            stats.requested = requested.len();
            stats.failed = self.request_batch(requested, language, &mut results).await;
        }

        stats.joined = joining.len();
        for (text, waiter) in joining {
            let value = waiter.wait().await.unwrap_or_else(|| text.clone());
            results.insert(text, value);
        }

        info!(
            %language,
            cached = stats.cached,
            joined = stats.joined,
            requested = stats.requested,
            failed = stats.failed,
            "Bulk translation pass complete"
        );
        (results, stats)
    }

    /// One batch call for every key we lead. Returns the number of texts that fell back.
    async fn request_batch(
        &self,
        leading: Vec<FlightGuard>,
        language: Language,
        results: &mut HashMap<String, String>,
    ) -> usize {
        let store = self.single.store();
        let request = BulkTranslateRequest {
            texts: leading.iter().map(|g| g.key().text().to_string()).collect(),
            target_language: language,
        };
        debug!(%language, count = request.texts.len(), "Sending batch translation request");

        let outcome = tokio::time::timeout(
            self.single.timeout(),
            self.single.provider().translate_batch(request),
        )
        .await
        .unwrap_or_else(|_| Err(AnuvadError::Timeout(self.single.timeout().as_millis() as u64)));

        let mut translations = match outcome {
            Ok(translations) => translations,
            Err(e) => {
                warn!(%language, "Batch translation failed: {}", e);
                return self.recover(leading, results).await;
            }
        };

        let mut failed = 0;
        for guard in leading {
            let key = guard.key().clone();
            let (value, state) = match translations.remove(key.text()) {
                Some(translated) if !translated.trim().is_empty() => (translated, EntryState::Resolved),
                _ => {
                    warn!(%language, "Batch response has no translation for {:?}", key.text());
                    failed += 1;
                    (key.text().to_string(), EntryState::Failed)
                }
            };
            store.put(key.clone(), value.clone(), state);
            guard.complete(&value);
            results.insert(key.text().to_string(), value);
        }
        failed
    }

    async fn recover(&self, leading: Vec<FlightGuard>, results: &mut HashMap<String, String>) -> usize {
        let count = leading.len();
        match self.on_failure {
            BulkFailurePolicy::NegativeCache => {
                let store = self.single.store();
                for guard in leading {
                    let key = guard.key().clone();
                    store.put(key.clone(), key.text().to_string(), EntryState::Failed);
                    guard.complete(key.text());
                    results.insert(key.text().to_string(), key.text().to_string());
                }
            }
            BulkFailurePolicy::SingleUnit => {
                let texts: Vec<String> = leading.iter().map(|g| g.key().text().to_string()).collect();
                let values = join_all(leading.into_iter().map(|guard| self.single.resolve(guard))).await;
                results.extend(texts.into_iter().zip(values));
            }
        }
        count
    }
}
