use std::collections::HashMap;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::info;

use crate::bulk::BulkTranslator;
use crate::cache::{TranslationCache, TranslationStore};
use crate::config::Config;
use crate::dictionary::OfflineDictionary;
use crate::error::{AnuvadError, Result};
use crate::extract::{ExclusionRules, TextTree};
use crate::inflight::InFlightRegistry;
use crate::language::Language;
use crate::lookup::{LookupState, ReactiveLookup, TextWatch};
use crate::orchestrator::{StructureReport, StructureTranslator};
use crate::provider::{HttpProvider, TranslationProvider};
use crate::translator::SingleTranslator;

/// Session-wide localization service.
///
/// Owns the cache, the in-flight registry and the active-language signal,
/// and hands out the translators built on them.
pub struct Localizer {
    cache: Arc<TranslationCache>,
    single: Arc<SingleTranslator>,
    bulk: Arc<BulkTranslator>,
    structures: StructureTranslator,
    lookup: ReactiveLookup,
    language_tx: watch::Sender<Language>,
}

impl Localizer {
    /// Build against the configured HTTP provider. Must run inside a tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = HttpProvider::new(config.provider.clone())?;
        Self::new(config, Arc::new(provider))
    }

    /// Build with any provider. Must run inside a tokio runtime.
    pub fn new(config: &Config, provider: Arc<dyn TranslationProvider>) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| AnuvadError::Config(format!("Localizer needs a tokio runtime: {}", e)))?;

        let dictionary = match &config.engine.dictionary_path {
            Some(path) => OfflineDictionary::load_with_overrides(path)?,
            None => OfflineDictionary::builtin(),
        };

        // The registry is scoped with the cache it guards.
        let (cache, flights) = if config.engine.use_global_cache {
            (
                TranslationCache::global(config.engine.cache_capacity, config.engine.notify_capacity)?,
                InFlightRegistry::global(),
            )
        } else {
            (
                Arc::new(TranslationCache::new(
                    config.engine.cache_capacity,
                    config.engine.notify_capacity,
                )),
                Arc::new(InFlightRegistry::new()),
            )
        };
        let store: Arc<dyn TranslationStore> = cache.clone();

        let single = Arc::new(SingleTranslator::new(
            store,
            flights,
            provider,
            Arc::new(dictionary),
            config.provider.timeout(),
            config.engine.offline_max_tokens,
        ));
        let bulk = Arc::new(BulkTranslator::new(single.clone(), config.engine.bulk_failure));
        let structures = StructureTranslator::new(bulk.clone(), ExclusionRules::from(&config.extract));

        let (language_tx, language_rx) = watch::channel(Language::SOURCE);
        let lookup = ReactiveLookup::new(single.clone(), language_rx, runtime, &config.lookup);

        info!(
            global_cache = config.engine.use_global_cache,
            cache_capacity = ?cache.capacity(),
            timeout_ms = config.provider.timeout_ms,
            debounce_ms = config.lookup.debounce_ms,
            "Localizer ready"
        );

        Ok(Self {
            cache,
            single,
            bulk,
            structures,
            lookup,
            language_tx,
        })
    }

    pub fn language(&self) -> Language {
        *self.language_tx.borrow()
    }

    /// Publish a new active language to every watcher.
    pub fn switch_language(&self, language: Language) {
        let previous = self.language_tx.send_replace(language);
        if previous != language {
            info!(from = %previous, to = %language, "Active language switched");
        }
    }

    pub fn language_signal(&self) -> watch::Receiver<Language> {
        self.language_tx.subscribe()
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    pub fn single(&self) -> &Arc<SingleTranslator> {
        &self.single
    }

    pub fn bulk(&self) -> &Arc<BulkTranslator> {
        &self.bulk
    }

    pub fn structures(&self) -> &StructureTranslator {
        &self.structures
    }

    pub fn lookup(&self) -> &ReactiveLookup {
        &self.lookup
    }

    pub async fn translate(&self, text: &str, language: Language) -> String {
        self.single.translate(text, language).await
    }

    pub async fn translate_bulk<S: AsRef<str>>(&self, texts: &[S], language: Language) -> HashMap<String, String> {
        self.bulk.translate(texts, language).await
    }

    /// Best value for `text` in the active language right now.
    pub fn text(&self, text: &str) -> LookupState {
        self.lookup.lookup(text)
    }

    pub fn watch(&self, text: &str) -> TextWatch {
        self.lookup.watch(text)
    }

    /// Translate a source-language structure into the active language.
    pub async fn translate_structure<T: TextTree + Clone>(&self, source: &T) -> (T, StructureReport) {
        self.structures.translate_copy(source, self.language()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeProvider;
    use serde_json::json;

    fn private_config() -> Config {
        let mut config = Config::default();
        config.engine.use_global_cache = false;
        config
    }

    #[tokio::test]
    async fn test_language_switch_drives_structure_translation() {
        let fake = Arc::new(FakeProvider::new());
        let localizer = Localizer::new(&private_config(), fake.clone()).unwrap();
        let form = json!({"title": "Hello", "options": ["Yes", "No"]});

        let (untouched, _) = localizer.translate_structure(&form).await;
        assert_eq!(untouched, form);

        localizer.switch_language(Language::Kannada);
        let (translated, report) = localizer.translate_structure(&form).await;
        assert_eq!(translated, json!({"title": "ನಮಸ್ಕಾರ", "options": ["ಹೌದು", "ಇಲ್ಲ"]}));
        assert_eq!(report.leaves, 3);
        assert_eq!(localizer.text("Yes").text, "ಹೌದು");
        assert_eq!(fake.total_calls(), 1);
    }

    #[tokio::test]
    async fn test_private_caches_are_isolated() {
        let first = Localizer::new(&private_config(), Arc::new(FakeProvider::new())).unwrap();
        let second = Localizer::new(&private_config(), Arc::new(FakeProvider::new())).unwrap();

        first.translate("Yes", Language::Kannada).await;
        assert_eq!(first.cache().len(), 1);
        assert!(second.cache().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_localizers_share_in_flight_requests() {
        let fake = Arc::new(FakeProvider::new().with_delay(std::time::Duration::from_millis(200)));
        let first = Localizer::new(&Config::default(), fake.clone()).unwrap();
        let second = Localizer::new(&Config::default(), fake.clone()).unwrap();
        assert!(Arc::ptr_eq(first.cache(), second.cache()));

        let text = "Main occupation of the household head";
        let (a, b) = tokio::join!(
            first.translate(text, Language::Kannada),
            second.translate(text, Language::Kannada),
        );

        assert_eq!(a, format!("[kn] {}", text));
        assert_eq!(a, b);
        assert_eq!(fake.single_calls(), 1);
    }

    #[tokio::test]
    async fn test_global_cache_settings_must_match() {
        TranslationCache::global(None, Config::default().engine.notify_capacity).unwrap();

        let mut config = Config::default();
        config.engine.cache_capacity = Some(1);
        let result = Localizer::new(&config, Arc::new(FakeProvider::new()));
        assert!(matches!(result, Err(AnuvadError::Config(_))));
    }

    #[test]
    fn test_requires_runtime() {
        let result = Localizer::new(&private_config(), Arc::new(FakeProvider::new()));
        assert!(matches!(result, Err(AnuvadError::Config(_))));
    }

    #[tokio::test]
    async fn test_missing_dictionary_file_is_an_error() {
        let mut config = private_config();
        config.engine.dictionary_path = Some("/nonexistent/dictionary.toml".into());
        let result = Localizer::new(&config, Arc::new(FakeProvider::new()));
        assert!(matches!(result, Err(AnuvadError::Dictionary(_))));
    }
}
