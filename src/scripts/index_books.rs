use crate::{
    config::Config,
    error::{AppError, Result},
    ml::{Embedder, OpenAiEmbedder},
    models::{BookRecord, DocumentMetadata, IndexedDocument, RetrievalHit},
    services::{
        chroma::{ChromaCollection, VectorStore},
        dataset::{build_document, load_book_summaries},
        retrieval::Retriever,
    },
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub upserted: usize,
    pub total_in_collection: usize,
}

/// Stable id for the record at `position`.
pub fn document_id(position: usize, record: &BookRecord) -> String {
    format!("book-{}-{}", position, record.title)
}

/// Documents for `records`, paired positionally with `embeddings`.
pub fn build_indexed_documents(
    records: &[BookRecord],
    embeddings: Vec<Vec<f32>>,
) -> Result<Vec<IndexedDocument>> {
    if embeddings.len() != records.len() {
        return Err(AppError::ExternalServiceError(format!(
            "Got {} embeddings for {} documents",
            embeddings.len(),
            records.len()
        )));
    }

    Ok(records
        .iter()
        .zip(embeddings)
        .enumerate()
        .map(|(idx, (record, embedding))| IndexedDocument {
            id: document_id(idx, record),
            document_text: build_document(record),
            metadata: DocumentMetadata {
                title: record.title.clone(),
                themes: record.themes.join(", "),
            },
            embedding,
        })
        .collect())
}

/// Embed every record in one batched call and upsert the results by id.
pub async fn ingest_books(
    records: &[BookRecord],
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
) -> Result<IngestReport> {
    if records.is_empty() {
        warn!("No book records to ingest, reporting the current collection size");
        return Ok(IngestReport {
            upserted: 0,
            total_in_collection: store.count().await?,
        });
    }

    let texts: Vec<String> = records.iter().map(build_document).collect();
    info!(
        "Embedding {} documents with {}",
        texts.len(),
        embedder.model_name()
    );
    let embeddings = embedder.embed_batch(&texts).await?;

    let documents = build_indexed_documents(records, embeddings)?;
    store.upsert(&documents).await?;

    Ok(IngestReport {
        upserted: documents.len(),
        total_in_collection: store.count().await?,
    })
}

fn spinner(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}"));
    bar.set_message(message);
    bar.enable_steady_tick(120);
    bar
}

pub fn format_probe_line(rank: usize, hit: &RetrievalHit) -> String {
    format!("  {}. {}  (distance: {})", rank, hit.title, hit.distance)
}

/// Load the source file, ingest it, and optionally run a probe query.
pub async fn run_ingestion(config: &Config, probe: Option<&str>, top_k: usize) -> Result<()> {
    info!("Starting book ingestion from {}", config.data_path.display());

    let records = load_book_summaries(&config.data_path)?;
    let embedder = Arc::new(OpenAiEmbedder::from_config(config)?);
    let store = Arc::new(ChromaCollection::from_config(config).await?);

    let bar = spinner("Embedding and upserting book summaries...");
    let report = ingest_books(&records, embedder.as_ref(), store.as_ref()).await;
    bar.finish_and_clear();
    let report = report?;

    info!(
        "Upserted {} documents into '{}'",
        report.upserted,
        store.name()
    );
    println!(
        "Ingested into collection='{}'. Total items now: {}.",
        store.name(),
        report.total_in_collection
    );
    println!("Chroma server: {}", config.chroma_url);

    if let Some(query) = probe {
        let retriever = Retriever::new(embedder, store);
        let hits = retriever.retrieve(query, top_k).await?;
        println!("\n[Probe] Query: {}", query);
        for (i, hit) in hits.iter().enumerate() {
            println!("{}", format_probe_line(i + 1, hit));
        }
    }

    Ok(())
}
