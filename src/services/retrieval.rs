use crate::{
    error::{AppError, Result},
    ml::Embedder,
    models::RetrievalHit,
    services::chroma::VectorStore,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Query-time half of the pipeline: embed the query, then search the collection.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    /// `embedder` must be the same model the collection was ingested with.
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Up to `top_k` hits ordered by ascending distance.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalHit>> {
        if top_k == 0 {
            return Err(AppError::InvalidInput(
                "top_k must be a positive integer".to_string(),
            ));
        }

        let embedding = self.embedder.embed(query).await?;
        let mut hits = self.store.query(&embedding, top_k).await?;

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(top_k);

        info!(
            "Retrieved {} hits from '{}' for query ({} chars)",
            hits.len(),
            self.store.name(),
            query.len()
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            for hit in &hits {
                debug!(
                    "  {} (distance={:.3}, similarity={:.3})",
                    hit.title, hit.distance, hit.similarity
                );
            }
        }

        Ok(hits)
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }
}
