use serde::{Deserialize, Serialize};

use super::RetrievalHit;

/// Outcome of reading the recommended title out of a model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "title", rename_all = "snake_case")]
pub enum TitleExtraction {
    Found(String),
    /// The model answered but no usable `RECOMMENDATION_TITLE:` line was present.
    Unparseable,
    /// No model call was made for this query.
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub response_text: String,
    pub title: TitleExtraction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub hits: Vec<RetrievalHit>,
}

impl RecommendationResult {
    /// A fixed reply that did not involve the chat model.
    pub fn message(text: impl Into<String>, hits: Vec<RetrievalHit>) -> Self {
        Self {
            response_text: text.into(),
            title: TitleExtraction::NotAttempted,
            summary: None,
            hits,
        }
    }

    pub fn extracted_title(&self) -> Option<&str> {
        match &self.title {
            TitleExtraction::Found(title) => Some(title),
            _ => None,
        }
    }

    /// Transcript form used by the interactive chat.
    pub fn render(&self) -> String {
        match &self.summary {
            Some(summary) => format!(
                "{}\n\nRezumat detaliat:\n{}",
                self.response_text, summary
            ),
            None => self.response_text.clone(),
        }
    }
}
