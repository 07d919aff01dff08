#![allow(dead_code)]

use async_trait::async_trait;
use smart_librarian::{
    error::Result,
    ml::Embedder,
    models::{IndexedDocument, RetrievalHit},
    services::{chat_completion::ChatRequest, ChatModel, VectorStore},
};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

const DIMENSIONS: usize = 64;

/// Deterministic bag-of-words embedder: each lowercase word bumps one bucket.
#[derive(Default)]
pub struct HashingEmbedder {
    pub batch_calls: AtomicUsize,
}

fn bucket(word: &str) -> usize {
    word.bytes()
        .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
        % DIMENSIONS
}

pub fn embed_text(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; DIMENSIONS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        vector[bucket(&word.to_lowercase())] += 1.0;
    }
    vector
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| embed_text(t)).collect())
    }

    fn model_name(&self) -> &str {
        "hashing-test"
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Vector store kept in a map keyed by document id.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<String, IndexedDocument>>,
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn upsert(&self, documents: &[IndexedDocument]) -> Result<()> {
        let mut stored = self.documents.lock().unwrap();
        for doc in documents {
            stored.insert(doc.id.clone(), doc.clone());
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievalHit>> {
        let stored = self.documents.lock().unwrap();
        let mut hits: Vec<RetrievalHit> = stored
            .values()
            .map(|doc| {
                RetrievalHit::new(
                    doc.id.clone(),
                    doc.metadata.title.clone(),
                    doc.document_text.clone(),
                    cosine_distance(&doc.embedding, embedding),
                )
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.documents.lock().unwrap().len())
    }

    fn name(&self) -> &str {
        "books"
    }
}

/// Chat model with a canned reply that records every request.
pub struct ScriptedChat {
    reply: String,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.reply.trim().to_string())
    }
}

pub const SAMPLE_BOOKS: &str = r#"[
    {"title": "1984", "short_summary": "A story about Big Brother and surveillance in a totalitarian state.", "themes": ["freedom", "control"]},
    {"title": "The Hobbit", "short_summary": "Bilbo Baggins joins dwarves and a wizard on a quest full of magic and friendship.", "themes": ["adventure", "friendship", "magic"]},
    {"title": "Pride and Prejudice", "short_summary": "Elizabeth Bennet navigates manners, marriage and misjudgment.", "full_summary": "Elizabeth Bennet and Mr. Darcy overcome pride and prejudice in Regency England."}
]"#;
