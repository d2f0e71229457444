// Remote translation providers
//
// The engine only sees the `TranslationProvider` trait. `HttpProvider` talks to
// the survey backend's translation endpoints; tests plug in mocks or fakes.

pub mod http;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpProvider;
use crate::error::Result;
use crate::language::Language;

/// Body of a single-text request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: String,
    pub source_language: Language,
    pub target_language: Language,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
}

/// Body of a batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkTranslateRequest {
    pub texts: Vec<String>,
    pub target_language: Language,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkTranslateResponse {
    #[serde(default)]
    pub translations: HashMap<String, String>,
}

/// Main trait for remote translation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    /// Translate one text
    async fn translate(&self, request: TranslateRequest) -> Result<String>;

    /// Translate many texts in one call. Missing entries are per-text failures.
    async fn translate_batch(&self, request: BulkTranslateRequest) -> Result<HashMap<String, String>>;
}
