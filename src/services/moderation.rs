//! Romanian profanity filter for incoming queries.
//!
//! The word list lives on disk. On first start it is downloaded, or replaced
//! with a small built-in list when the download fails. Build the filter once
//! at startup with [`ProfanityFilter::initialize`] and share it by `Arc`.

use crate::{config::Config, error::Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);
const MIN_DOWNLOADED_WORDS: usize = 5;
const CENSOR_MASK: &str = "****";

const FALLBACK_RO_WORDS: &[&str] = &[
    "pula", "pizda", "dracu", "bou", "proasta", "prost", "idiot", "idiota", "bulangiu",
];

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("static regex"));

/// Entries are stored as lowercase word sequences so phrases match across
/// any whitespace or punctuation between their words.
#[derive(Debug, Clone)]
pub struct ProfanityFilter {
    entries: HashSet<Vec<String>>,
    longest: usize,
    wordlist_path: PathBuf,
    wordlist_url: String,
}

fn clean_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn tokenize(text: &str) -> Vec<(usize, usize, String)> {
    WORD.find_iter(text)
        .map(|m| (m.start(), m.end(), m.as_str().to_lowercase()))
        .collect()
}

fn has_words(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

impl ProfanityFilter {
    /// A filter over an explicit word list, without touching disk or network.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries: HashSet<Vec<String>> = words
            .into_iter()
            .map(|w| tokenize(w.as_ref()).into_iter().map(|(_, _, t)| t).collect::<Vec<_>>())
            .filter(|tokens| !tokens.is_empty())
            .collect();
        Self {
            longest: entries.iter().map(Vec::len).max().unwrap_or(0),
            entries,
            wordlist_path: PathBuf::new(),
            wordlist_url: String::new(),
        }
    }

    /// Make sure the word list exists on disk, then load it.
    pub async fn initialize(wordlist_path: &Path, wordlist_url: &str) -> Result<Self> {
        ensure_wordlist(wordlist_path, wordlist_url, false).await?;
        let content = fs::read_to_string(wordlist_path)?;
        let words = clean_lines(&content);
        info!(
            "Loaded {} moderation words from {}",
            words.len(),
            wordlist_path.display()
        );

        let mut filter = Self::from_words(words);
        filter.wordlist_path = wordlist_path.to_path_buf();
        filter.wordlist_url = wordlist_url.to_string();
        Ok(filter)
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::initialize(&config.wordlist_path, &config.wordlist_url).await
    }

    /// Rebuild from disk. With `force_download` a fresh copy is fetched first;
    /// a failed refresh keeps the existing file.
    pub async fn reload(&self, force_download: bool) -> Result<Self> {
        if force_download {
            ensure_wordlist(&self.wordlist_path, &self.wordlist_url, true).await?;
        }
        Self::initialize(&self.wordlist_path, &self.wordlist_url).await
    }

    /// Length in tokens of the longest entry starting at `tokens[0]`.
    fn match_at(&self, tokens: &[(usize, usize, String)]) -> Option<usize> {
        (1..=self.longest.min(tokens.len())).rev().find(|&n| {
            let words: Vec<String> = tokens[..n].iter().map(|(_, _, t)| t.clone()).collect();
            self.entries.contains(&words)
        })
    }

    pub fn is_inappropriate(&self, text: &str) -> bool {
        let tokens = tokenize(text);
        (0..tokens.len()).any(|i| self.match_at(&tokens[i..]).is_some())
    }

    /// Replace every matched word or phrase with `****`.
    pub fn censor(&self, text: &str) -> String {
        let tokens = tokenize(text);
        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        let mut i = 0;
        while i < tokens.len() {
            match self.match_at(&tokens[i..]) {
                Some(n) => {
                    out.push_str(&text[copied..tokens[i].0]);
                    out.push_str(CENSOR_MASK);
                    copied = tokens[i + n - 1].1;
                    i += n;
                }
                None => i += 1,
            }
        }
        out.push_str(&text[copied..]);
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

async fn download_wordlist(url: &str) -> std::result::Result<Vec<String>, String> {
    let client = Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|e| e.to_string())?;

    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("status {}", response.status()));
    }
    let body = response.text().await.map_err(|e| e.to_string())?;

    let lines = clean_lines(&body);
    if lines.len() < MIN_DOWNLOADED_WORDS {
        return Err(format!("downloaded list seems too short ({} lines)", lines.len()));
    }
    Ok(lines)
}

async fn ensure_wordlist(path: &Path, url: &str, force_download: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let present = has_words(path);
    if present && !force_download {
        return Ok(());
    }

    match download_wordlist(url).await {
        Ok(lines) => {
            info!("Downloaded {} moderation words from {}", lines.len(), url);
            fs::write(path, lines.join("\n") + "\n")?;
        }
        Err(e) if present => {
            warn!("Word list refresh failed, keeping existing file: {}", e);
        }
        Err(e) => {
            warn!("Word list download failed, using built-in list: {}", e);
            fs::write(path, FALLBACK_RO_WORDS.join("\n") + "\n")?;
        }
    }
    Ok(())
}
