use crate::error::{AppError, Result};
use config::{builder::DefaultState, ConfigBuilder};
use serde::Deserialize;
use std::{env, path::PathBuf};

pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
const ENV_PREFIX: &str = "LIBRARIAN";

const DEFAULT_WORDLIST_URL: &str =
    "https://raw.githubusercontent.com/Mihaidev-cloud/swear-words-romanian/master/ro";

/// Runtime settings, layered as defaults < `LIBRARIAN_*` environment variables.
///
/// The OpenAI credential is read separately from `OPENAI_API_KEY` so the same
/// `.env` file works for every tool that talks to the API.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data_path: PathBuf,
    pub chroma_url: String,
    pub chroma_tenant: String,
    pub chroma_database: String,
    pub collection_name: String,
    pub openai_base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
    pub top_k: usize,
    pub request_timeout_secs: u64,
    pub wordlist_path: PathBuf,
    pub wordlist_url: String,
    pub moderation_enabled: bool,
    pub host: String,
    pub port: u16,
    #[serde(skip)]
    pub openai_api_key: Option<String>,
}

impl Config {
    /// Load `.env`, then build the settings from defaults and the environment.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let settings = Self::defaults()?
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.openai_api_key = env::var(API_KEY_VAR)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        config.validate()?;
        Ok(config)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(config::Config::builder()
            .set_default("data_path", "data/raw/book_summaries.json")?
            .set_default("chroma_url", "http://localhost:8000")?
            .set_default("chroma_tenant", "default_tenant")?
            .set_default("chroma_database", "default_database")?
            .set_default("collection_name", "books")?
            .set_default("openai_base_url", "https://api.openai.com/v1")?
            .set_default("embedding_model", "text-embedding-3-small")?
            .set_default("chat_model", "gpt-4o-mini")?
            .set_default("temperature", 0.4)?
            .set_default("top_k", 4)?
            .set_default("request_timeout_secs", 60)?
            .set_default("wordlist_path", "data/external/badwords_ro.txt")?
            .set_default("wordlist_url", DEFAULT_WORDLIST_URL)?
            .set_default("moderation_enabled", false)?
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8080)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(AppError::Configuration(
                "top_k must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::Configuration(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        if self.collection_name.trim().is_empty() {
            return Err(AppError::Configuration(
                "collection_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The API credential, or a `MissingCredential` error naming the variable.
    pub fn require_api_key(&self) -> Result<&str> {
        self.openai_api_key.as_deref().ok_or_else(|| {
            AppError::MissingCredential(format!(
                "{} not set. Put it in .env and load your environment.",
                API_KEY_VAR
            ))
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Self {
            data_path: PathBuf::from("data/raw/book_summaries.json"),
            chroma_url: "http://localhost:8000".to_string(),
            chroma_tenant: "default_tenant".to_string(),
            chroma_database: "default_database".to_string(),
            collection_name: "books".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.4,
            top_k: 4,
            request_timeout_secs: 60,
            wordlist_path: PathBuf::from("data/external/badwords_ro.txt"),
            wordlist_url: DEFAULT_WORDLIST_URL.to_string(),
            moderation_enabled: false,
            host: "127.0.0.1".to_string(),
            port: 8080,
            openai_api_key: None,
        }
    }
}
