use crate::{
    config::Config,
    error::{AppError, Result},
    ml::Embedder,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Client for the OpenAI `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    endpoint: String,
    model_name: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
pub(crate) struct OpenAiErrorResponse {
    pub error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
pub(crate) struct OpenAiErrorDetail {
    pub message: String,
}

/// Extract the `error.message` field of an OpenAI error body, falling back to the raw text.
pub(crate) fn error_detail(body: String) -> String {
    serde_json::from_str::<OpenAiErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

impl OpenAiEmbedder {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model_name: &str,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::MissingCredential(
                "OpenAI API key is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model_name: model_name.to_string(),
        })
    }

    /// Fails with `MissingCredential` when `OPENAI_API_KEY` is absent.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.require_api_key()?,
            &config.openai_base_url,
            &config.embedding_model,
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            model = %self.model_name,
            batch_size = texts.len(),
            "Requesting embeddings"
        );

        let request = EmbeddingRequest {
            model: &self.model_name,
            input: texts,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Embedding request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = error_detail(response.text().await.unwrap_or_default());
            error!(%status, "Embedding API error: {}", detail);
            return Err(AppError::ExternalServiceError(format!(
                "Embedding API returned {}: {}",
                status, detail
            )));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::SerializationError(format!("Failed to parse embedding response: {}", e))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(AppError::ExternalServiceError(format!(
                "Embedding API returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
