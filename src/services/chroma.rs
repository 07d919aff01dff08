use crate::{
    config::Config,
    error::{AppError, Result},
    models::{DocumentMetadata, IndexedDocument, RetrievalHit},
};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// A persisted collection of embedded documents.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite documents by id.
    async fn upsert(&self, documents: &[IndexedDocument]) -> Result<()>;

    /// Up to `top_k` nearest documents, nearest first.
    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievalHit>>;

    async fn count(&self) -> Result<usize>;

    fn name(&self) -> &str;
}

/// Handle to one collection on a Chroma server (HTTP API v2).
#[derive(Debug, Clone)]
pub struct ChromaCollection {
    client: Client,
    collection_url: String,
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateCollectionRequest<'a> {
    name: &'a str,
    get_or_create: bool,
    metadata: Value,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: Vec<&'a [f32]>,
    documents: Vec<&'a str>,
    metadatas: Vec<&'a DocumentMetadata>,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query_embeddings: [&'a [f32]; 1],
    n_results: usize,
    include: [&'static str; 3],
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,
    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Value>>>>,
    #[serde(default)]
    distances: Option<Vec<Vec<Option<f32>>>>,
}

async fn check_status(response: Response, operation: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().await.unwrap_or_default();
    Err(AppError::ExternalServiceError(format!(
        "Chroma {} failed ({}): {}",
        operation, status, error_text
    )))
}

impl ChromaCollection {
    /// Get or create `name` under the given tenant and database.
    pub async fn connect(
        base_url: &str,
        tenant: &str,
        database: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        let collections_url = format!(
            "{}/api/v2/tenants/{}/databases/{}/collections",
            base_url.trim_end_matches('/'),
            tenant,
            database
        );

        let request = CreateCollectionRequest {
            name,
            get_or_create: true,
            metadata: json!({ "hnsw:space": "cosine" }),
        };

        let response = client.post(&collections_url).json(&request).send().await?;
        let info: CollectionInfo = check_status(response, "get_or_create_collection")
            .await?
            .json()
            .await?;

        info!("Using Chroma collection '{}' ({})", info.name, info.id);

        Ok(Self {
            client,
            collection_url: format!("{}/{}", collections_url, info.id),
            id: info.id,
            name: info.name,
        })
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::connect(
            &config.chroma_url,
            &config.chroma_tenant,
            &config.chroma_database,
            &config.collection_name,
            Duration::from_secs(config.request_timeout_secs),
        )
        .await
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

fn hits_from_response(response: QueryResponse) -> Result<Vec<RetrievalHit>> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let mut documents = response
        .documents
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default()
        .into_iter();
    let mut metadatas = response
        .metadatas
        .and_then(|m| m.into_iter().next())
        .unwrap_or_default()
        .into_iter();
    let mut distances = response
        .distances
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default()
        .into_iter();

    ids.into_iter()
        .map(|id| {
            let document = documents.next().flatten().unwrap_or_default();
            let title = metadatas
                .next()
                .flatten()
                .and_then(|m| m.get("title").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| id.clone());
            let distance = distances.next().flatten().ok_or_else(|| {
                AppError::ExternalServiceError(format!(
                    "Chroma query returned no distance for '{}'",
                    id
                ))
            })?;
            Ok(RetrievalHit::new(id, title, document, distance))
        })
        .collect()
}

#[async_trait]
impl VectorStore for ChromaCollection {
    async fn upsert(&self, documents: &[IndexedDocument]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let request = UpsertRequest {
            ids: documents.iter().map(|d| d.id.as_str()).collect(),
            embeddings: documents.iter().map(|d| d.embedding.as_slice()).collect(),
            documents: documents.iter().map(|d| d.document_text.as_str()).collect(),
            metadatas: documents.iter().map(|d| &d.metadata).collect(),
        };

        debug!("Upserting {} documents into '{}'", documents.len(), self.name);

        let response = self
            .client
            .post(format!("{}/upsert", self.collection_url))
            .json(&request)
            .send()
            .await?;
        check_status(response, "upsert").await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievalHit>> {
        let request = QueryRequest {
            query_embeddings: [embedding],
            n_results: top_k,
            include: ["documents", "metadatas", "distances"],
        };

        let response = self
            .client
            .post(format!("{}/query", self.collection_url))
            .json(&request)
            .send()
            .await?;
        let parsed: QueryResponse = check_status(response, "query").await?.json().await?;
        hits_from_response(parsed)
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .client
            .get(format!("{}/count", self.collection_url))
            .send()
            .await?;
        let count = check_status(response, "count").await?.json().await?;
        Ok(count)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_from_response() {
        let response: QueryResponse = serde_json::from_value(json!({
            "ids": [["book-0-1984", "book-1-Dune"]],
            "documents": [["Title: 1984\nBig Brother.", "Title: Dune\nSpice."]],
            "metadatas": [[{"title": "1984", "themes": ""}, {"title": "Dune", "themes": "desert"}]],
            "distances": [[0.25, 0.5]],
            "embeddings": null
        }))
        .unwrap();

        let hits = hits_from_response(response).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "1984");
        assert_eq!(hits[0].document_text, "Title: 1984\nBig Brother.");
        assert_eq!(hits[0].similarity, 0.75);
        assert_eq!(hits[1].id, "book-1-Dune");
    }

    #[test]
    fn test_empty_collection_yields_no_hits() {
        let response: QueryResponse = serde_json::from_value(json!({
            "ids": [[]],
            "documents": [[]],
            "metadatas": [[]],
            "distances": [[]]
        }))
        .unwrap();
        assert!(hits_from_response(response).unwrap().is_empty());
    }

    #[test]
    fn test_missing_title_falls_back_to_id() {
        let response: QueryResponse = serde_json::from_value(json!({
            "ids": [["book-3-x"]],
            "documents": [[null]],
            "metadatas": [[null]],
            "distances": [[0.1]]
        }))
        .unwrap();
        let hits = hits_from_response(response).unwrap();
        assert_eq!(hits[0].title, "book-3-x");
        assert_eq!(hits[0].document_text, "");
    }

    #[test]
    fn test_missing_distance_is_an_error() {
        let response: QueryResponse = serde_json::from_value(json!({
            "ids": [["book-0-a"]],
            "distances": null
        }))
        .unwrap();
        assert!(matches!(
            hits_from_response(response),
            Err(AppError::ExternalServiceError(_))
        ));
    }
}
