use serde::{Deserialize, Serialize};

/// A validated entry from the book-summary source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub short_summary: String,
    /// Longer summary served by the summary lookup when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_summary: Option<String>,
    #[serde(default)]
    pub themes: Vec<String>,
}

impl BookRecord {
    pub fn new(title: impl Into<String>, short_summary: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            short_summary: short_summary.into(),
            full_summary: None,
            themes: Vec::new(),
        }
    }

    pub fn with_themes<I, S>(mut self, themes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.themes = themes.into_iter().map(Into::into).collect();
        self
    }

    /// The summary shown to the reader: the full one if available.
    pub fn detailed_summary(&self) -> &str {
        self.full_summary.as_deref().unwrap_or(&self.short_summary)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    /// Comma-joined theme list, empty when the record has none.
    pub themes: String,
}

/// A book document as stored in the vector collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub document_text: String,
    pub metadata: DocumentMetadata,
    pub embedding: Vec<f32>,
}

/// One nearest-neighbour match for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub id: String,
    pub title: String,
    pub document_text: String,
    pub distance: f32,
    pub similarity: f32,
}

impl RetrievalHit {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        document_text: impl Into<String>,
        distance: f32,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            document_text: document_text.into(),
            distance,
            similarity: 1.0 - distance,
        }
    }
}
