use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use super::{
    BulkTranslateRequest, BulkTranslateResponse, TranslateRequest, TranslateResponse,
    TranslationProvider,
};
use crate::config::ProviderConfig;
use crate::error::{AnuvadError, Result};

const API_KEY_ENV: &str = "ANUVAD_API_KEY";

/// Translation endpoints of the survey backend.
pub struct HttpProvider {
    client: Client,
    config: ProviderConfig,
    api_key: Option<String>,
}

impl HttpProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        // The engine enforces its own budget; this only bounds stuck sockets.
        let client = Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(config.timeout() * 2)
            .build()?;

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty());

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let request_id = Uuid::new_v4();
        let url = self.url(path);
        debug!(%request_id, "POST {}", url);

        let builder = self
            .client
            .post(url)
            .header("X-Request-Id", request_id.to_string());
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AnuvadError::Provider {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        });
    }
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl TranslationProvider for HttpProvider {
    async fn translate(&self, request: TranslateRequest) -> Result<String> {
        let response = self
            .post(&self.config.single_path)
            .json(&request)
            .send()
            .await?;
        let body: TranslateResponse = decode(response).await?;
        Ok(body.translated_text)
    }

    async fn translate_batch(&self, request: BulkTranslateRequest) -> Result<HashMap<String, String>> {
        let response = self
            .post(&self.config.bulk_path)
            .json(&request)
            .send()
            .await?;
        let body: BulkTranslateResponse = decode(response).await?;
        Ok(body.translations)
    }
}
