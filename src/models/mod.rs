use serde::{Deserialize, Serialize};

pub use book::{BookRecord, DocumentMetadata, IndexedDocument, RetrievalHit};
pub use recommendation::{RecommendationResult, TitleExtraction};

mod book;
mod recommendation;

/// Request structure for a single recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    /// Free-text description of the reader's interest
    pub query: String,
    /// Number of candidates handed to the model (server default when omitted)
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Request structure for raw retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveResponse {
    pub hits: Vec<RetrievalHit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub title: String,
    pub summary: String,
    pub found: bool,
}

/// Health check response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC3339 format
    pub timestamp: String,
}
