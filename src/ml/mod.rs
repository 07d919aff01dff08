pub mod openai_embedder;

pub use openai_embedder::OpenAiEmbedder;

use crate::error::{AppError, Result};
use async_trait::async_trait;

/// Turns text into vectors. Ingestion and retrieval must share one model so
/// that stored and query vectors live in the same space.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppError::ExternalServiceError("Embedding API returned no vectors".to_string())
            })
    }

    fn model_name(&self) -> &str;
}
