use crate::{
    config::Config,
    error::{AppError, Result},
    models::{RecommendationResult, RetrievalHit, TitleExtraction},
    services::{
        chat_completion::{ChatMessage, ChatModel, ChatRequest},
        moderation::ProfanityFilter,
        retrieval::Retriever,
        summaries::SummaryIndex,
    },
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NO_MATCH_MESSAGE: &str = "Nu am găsit o potrivire. Încearcă să reformulezi.";
pub const MISSING_KEY_MESSAGE: &str = "Lipsește OPENAI_API_KEY în .env sau în mediul curent.";
pub const INAPPROPRIATE_MESSAGE: &str =
    "Te rog să reformulezi întrebarea fără limbaj nepotrivit.";

const SYSTEM_PROMPT: &str = "Ești un asistent care recomandă o singură carte din contextul primit.";

static TITLE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*RECOMMENDATION_TITLE:\s*(.+?)[ \t\r]*$").expect("static regex")
});

/// Per-request knobs for the chat step.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationOptions {
    pub top_k: usize,
    pub model: String,
    pub temperature: f32,
}

impl RecommendationOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.top_k,
            model: config.chat_model.clone(),
            temperature: config.temperature,
        }
    }
}

/// Services that need the API credential.
#[derive(Clone)]
struct Backend {
    retriever: Retriever,
    chat: Arc<dyn ChatModel>,
}

#[derive(Clone)]
pub struct RecommendationService {
    backend: Option<Backend>,
    summaries: Arc<SummaryIndex>,
    moderation: Option<Arc<ProfanityFilter>>,
}

/// Render retrieval hits as the context block of the prompt.
pub fn build_context(hits: &[RetrievalHit]) -> String {
    hits.iter()
        .map(|h| format!("- {}\n{}", h.title, h.document_text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "Context (top cărți):\n\
         {context}\n\
         \n\
         Întrebare: {query}\n\
         \n\
         Instrucțiuni:\n\
         - Alege o singură recomandare din context.\n\
         - Prima linie trebuie să fie exact: RECOMMENDATION_TITLE: <titlu>\n\
         - După prima linie, oferă un răspuns conversațional scurt (2–4 propoziții) în română.\n"
    )
}

/// Best-effort read of the `RECOMMENDATION_TITLE:` marker line.
pub fn extract_title(reply: &str) -> TitleExtraction {
    let quotes: &[char] = &['*', '_', '`', '"', '„', '“', '”'];
    TITLE_MARKER
        .captures(reply)
        .map(|caps| caps[1].trim_matches(quotes).trim().to_string())
        .filter(|title| !title.is_empty())
        .map_or(TitleExtraction::Unparseable, TitleExtraction::Found)
}

impl RecommendationService {
    /// A service with no model backend; every query gets the missing-key reply.
    pub fn without_backend(summaries: Arc<SummaryIndex>) -> Self {
        Self {
            backend: None,
            summaries,
            moderation: None,
        }
    }

    pub fn new(retriever: Retriever, chat: Arc<dyn ChatModel>, summaries: Arc<SummaryIndex>) -> Self {
        Self {
            backend: Some(Backend { retriever, chat }),
            summaries,
            moderation: None,
        }
    }

    pub fn with_moderation(mut self, filter: Arc<ProfanityFilter>) -> Self {
        self.moderation = Some(filter);
        self
    }

    pub fn summaries(&self) -> &SummaryIndex {
        &self.summaries
    }

    pub fn retriever(&self) -> Option<&Retriever> {
        self.backend.as_ref().map(|b| &b.retriever)
    }

    /// One retrieve -> prompt -> complete -> extract turn.
    pub async fn recommend(
        &self,
        query: &str,
        options: &RecommendationOptions,
    ) -> Result<RecommendationResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("Query cannot be empty".to_string()));
        }

        if let Some(filter) = self.moderation.as_deref() {
            if filter.is_inappropriate(query) {
                warn!("Rejected query: {}", filter.censor(query));
                return Ok(RecommendationResult::message(INAPPROPRIATE_MESSAGE, Vec::new()));
            }
        }

        let Some(backend) = &self.backend else {
            warn!("No OpenAI credential configured, skipping recommendation");
            return Ok(RecommendationResult::message(MISSING_KEY_MESSAGE, Vec::new()));
        };

        let hits = backend.retriever.retrieve(query, options.top_k).await?;
        if hits.is_empty() {
            info!("No candidates found for query");
            return Ok(RecommendationResult::message(NO_MATCH_MESSAGE, hits));
        }

        let request = ChatRequest {
            model: options.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(build_prompt(&build_context(&hits), query)),
            ],
            temperature: options.temperature,
        };

        let response_text = backend.chat.complete(&request).await?;
        let title = extract_title(&response_text);
        debug!("Model reply title: {:?}", title);

        let summary = match &title {
            TitleExtraction::Found(t) => Some(self.summaries.get_summary_by_title(t).to_string()),
            _ => {
                warn!("Model reply had no usable RECOMMENDATION_TITLE line");
                None
            }
        };

        Ok(RecommendationResult {
            response_text,
            title,
            summary,
            hits,
        })
    }
}
