use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use anuvad::provider::{BulkTranslateRequest, TranslateRequest, TranslationProvider};
use anuvad::{CacheKey, Config, EntryState, Language, Localizer, Result, TranslationStore};

/// Kannada-only provider that counts what it is asked.
#[derive(Default)]
struct SurveyBackend {
    delay: Option<Duration>,
    single_calls: AtomicUsize,
    batches: Mutex<Vec<Vec<String>>>,
}

impl SurveyBackend {
    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    fn word(text: &str) -> String {
        match text {
            "Submit" => "ಸಲ್ಲಿಸಿ".to_string(),
            "Yes" => "ಹೌದು".to_string(),
            "No" => "ಇಲ್ಲ".to_string(),
            "Next" => "ಮುಂದೆ".to_string(),
            other => format!("kn:{}", other),
        }
    }
}

#[async_trait]
impl TranslationProvider for SurveyBackend {
    async fn translate(&self, request: TranslateRequest) -> Result<String> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Self::word(&request.text))
    }

    async fn translate_batch(&self, request: BulkTranslateRequest) -> Result<HashMap<String, String>> {
        self.batches.lock().push(request.texts.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(request
            .texts
            .iter()
            .map(|text| (text.clone(), Self::word(text)))
            .collect())
    }
}

fn private_config() -> Config {
    let mut config = Config::default();
    config.engine.use_global_cache = false;
    config
}

#[tokio::test]
async fn single_translation_is_cached() {
    let backend = Arc::new(SurveyBackend::default());
    let localizer = Localizer::new(&private_config(), backend.clone()).unwrap();

    assert_eq!(localizer.translate("Submit", Language::Kannada).await, "ಸಲ್ಲಿಸಿ");
    assert_eq!(localizer.translate("Submit", Language::Kannada).await, "ಸಲ್ಲಿಸಿ");

    assert_eq!(backend.single_calls.load(Ordering::SeqCst), 1);
    let entry = localizer
        .cache()
        .get(&CacheKey::new("Submit", Language::Kannada))
        .unwrap();
    assert_eq!(entry.state, EntryState::Resolved);
}

#[tokio::test]
async fn bulk_sends_only_uncached_texts() {
    let backend = Arc::new(SurveyBackend::default());
    let localizer = Localizer::new(&private_config(), backend.clone()).unwrap();
    localizer.translate("Yes", Language::Kannada).await;

    let result = localizer
        .translate_bulk(&["Yes", "No", "No"], Language::Kannada)
        .await;

    assert_eq!(result.len(), 2);
    assert_eq!(result["Yes"], "ಹೌದು");
    assert_eq!(result["No"], "ಇಲ್ಲ");
    assert_eq!(*backend.batches.lock(), vec![vec!["No".to_string()]]);
}

#[tokio::test(start_paused = true)]
async fn timeout_falls_back_to_source_and_is_not_retried() {
    let backend = Arc::new(SurveyBackend::slow(Duration::from_secs(30)));
    let mut config = private_config();
    config.engine.offline_max_tokens = 0;
    let localizer = Localizer::new(&config, backend.clone()).unwrap();

    assert_eq!(localizer.translate("Next", Language::Kannada).await, "Next");
    assert_eq!(localizer.translate("Next", Language::Kannada).await, "Next");

    assert_eq!(backend.single_calls.load(Ordering::SeqCst), 1);
    let entry = localizer
        .cache()
        .get(&CacheKey::new("Next", Language::Kannada))
        .unwrap();
    assert_eq!(entry.state, EntryState::Failed);
}

#[tokio::test(start_paused = true)]
async fn timeout_uses_offline_dictionary_for_short_texts() {
    let backend = Arc::new(SurveyBackend::slow(Duration::from_secs(30)));
    let localizer = Localizer::new(&private_config(), backend).unwrap();

    assert_eq!(localizer.translate("Next", Language::Kannada).await, "ಮುಂದೆ");
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_share_one_provider_call() {
    let backend = Arc::new(SurveyBackend::slow(Duration::from_millis(200)));
    let localizer = Localizer::new(&private_config(), backend.clone()).unwrap();

    let (a, b, c) = tokio::join!(
        localizer.translate("Submit", Language::Kannada),
        localizer.translate("Submit", Language::Kannada),
        localizer.translate_bulk(&["Submit"], Language::Kannada),
    );

    assert_eq!(a, "ಸಲ್ಲಿಸಿ");
    assert_eq!(b, "ಸಲ್ಲಿಸಿ");
    assert_eq!(c["Submit"], "ಸಲ್ಲಿಸಿ");
    assert_eq!(backend.single_calls.load(Ordering::SeqCst), 1);
    assert!(backend.batches.lock().is_empty());
}

#[tokio::test]
async fn source_language_never_reaches_the_provider() {
    let backend = Arc::new(SurveyBackend::default());
    let localizer = Localizer::new(&private_config(), backend.clone()).unwrap();

    assert_eq!(localizer.translate("Submit", Language::English).await, "Submit");
    let result = localizer.translate_bulk(&["Yes", "No"], Language::English).await;
    assert_eq!(result["Yes"], "Yes");
    assert_eq!(result["No"], "No");

    assert_eq!(backend.single_calls.load(Ordering::SeqCst), 0);
    assert!(backend.batches.lock().is_empty());
    assert!(localizer.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn watched_text_updates_after_language_switch() {
    let backend = Arc::new(SurveyBackend::default());
    let localizer = Localizer::new(&private_config(), backend).unwrap();
    let mut watch = localizer.watch("Submit");
    assert_eq!(watch.current(), "Submit");

    localizer.switch_language(Language::Kannada);
    assert_eq!(watch.changed().await.as_deref(), Some("Submit"));

    let state = localizer.text("Submit");
    assert_eq!(state.text, "Submit");
    assert!(state.loading);

    assert_eq!(watch.changed().await.as_deref(), Some("ಸಲ್ಲಿಸಿ"));
    assert_eq!(localizer.text("Submit").text, "ಸಲ್ಲಿಸಿ");
}
