//! Counting in-memory provider shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{AnuvadError, Result};
use crate::language::Language;
use crate::provider::{BulkTranslateRequest, TranslateRequest, TranslationProvider};

#[derive(Default)]
pub struct FakeProvider {
    known: HashMap<String, String>,
    delay: Duration,
    failing: AtomicBool,
    omit: Vec<String>,
    single_calls: AtomicUsize,
    batch_calls: AtomicUsize,
    batches: Mutex<Vec<Vec<String>>>,
}

impl FakeProvider {
    /// Kannada survey vocabulary; anything else comes back as "[code] text".
    pub fn new() -> Self {
        let known = [
            ("Submit", "ಸಲ್ಲಿಸಿ"),
            ("Yes", "ಹೌದು"),
            ("No", "ಇಲ್ಲ"),
            ("Next", "ಮುಂದೆ"),
            ("Hello", "ನಮಸ್ಕಾರ"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            known,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    /// Leave `text` out of batch responses.
    pub fn omitting(mut self, text: &str) -> Self {
        self.omit.push(text.to_string());
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.single_calls() + self.batch_calls()
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }

    fn render(&self, text: &str, language: Language) -> String {
        match (language, self.known.get(text)) {
            (Language::Kannada, Some(known)) => known.clone(),
            _ => format!("[{}] {}", language.code(), text),
        }
    }

    async fn respond(&self) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(AnuvadError::Provider {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TranslationProvider for FakeProvider {
    async fn translate(&self, request: TranslateRequest) -> Result<String> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(self.render(&request.text, request.target_language))
    }

    async fn translate_batch(&self, request: BulkTranslateRequest) -> Result<HashMap<String, String>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().push(request.texts.clone());
        self.respond().await?;
        Ok(request
            .texts
            .iter()
            .filter(|text| !self.omit.contains(text))
            .map(|text| (text.clone(), self.render(text, request.target_language)))
            .collect())
    }
}
