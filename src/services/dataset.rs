use crate::{
    error::{AppError, Result},
    models::BookRecord,
};
use log::debug;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::{collections::HashMap, fs, io::ErrorKind, path::Path};

fn deserialize_themes<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ThemesValue {
        List(Vec<Value>),
        Scalar(Value),
    }

    let themes = match Option::<ThemesValue>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(ThemesValue::List(items)) => items.into_iter().map(value_to_text).collect(),
        Some(ThemesValue::Scalar(Value::Null)) => Vec::new(),
        Some(ThemesValue::Scalar(value)) => vec![value_to_text(value)],
    };

    Ok(themes
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawBookRecord {
    title: Option<String>,
    short_summary: Option<String>,
    summary: Option<String>,
    full_summary: Option<String>,
    #[serde(default, deserialize_with = "deserialize_themes")]
    themes: Vec<String>,
}

/// Read and validate the book-summary source at `path`.
pub fn load_book_summaries(path: &Path) -> Result<Vec<BookRecord>> {
    let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AppError::NotFound(format!(
            "Missing {}. Create the book summaries JSON file first.",
            path.display()
        )),
        _ => AppError::from(e),
    })?;

    let records = parse_book_summaries(&raw)?;
    debug!("Loaded {} book records from {}", records.len(), path.display());
    Ok(records)
}

/// Accepts either `{"Title": "summary", ...}` or
/// `[{"title": ..., "short_summary"|"summary": ..., "themes": [...]}, ...]`.
pub fn parse_book_summaries(json: &str) -> Result<Vec<BookRecord>> {
    let data: Value = serde_json::from_str(json)?;

    let raw_records = match data {
        Value::Object(map) => from_title_map(map),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value::<RawBookRecord>(item)
                    .map_err(|e| AppError::InvalidInput(format!("Record {} is malformed: {}", i, e)))
            })
            .collect::<Result<Vec<_>>>()?,
        _ => {
            return Err(AppError::InvalidInput(
                "book summaries must be an object or a list of records".to_string(),
            ))
        }
    };

    validate_records(raw_records)
}

fn from_title_map(map: Map<String, Value>) -> Vec<RawBookRecord> {
    map.into_iter()
        .map(|(title, summary)| RawBookRecord {
            title: Some(title),
            short_summary: match summary {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            },
            ..RawBookRecord::default()
        })
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_records(raw_records: Vec<RawBookRecord>) -> Result<Vec<BookRecord>> {
    let mut seen: HashMap<String, usize> = HashMap::with_capacity(raw_records.len());
    let mut records = Vec::with_capacity(raw_records.len());

    for (i, raw) in raw_records.into_iter().enumerate() {
        let title = non_blank(raw.title);
        let short_summary = non_blank(raw.short_summary).or_else(|| non_blank(raw.summary));

        let (title, short_summary) = match (title, short_summary) {
            (Some(title), Some(summary)) => (title, summary),
            _ => {
                return Err(AppError::InvalidInput(format!(
                    "Record {} missing title/short_summary.",
                    i
                )))
            }
        };

        if let Some(first) = seen.insert(title.to_lowercase(), i) {
            return Err(AppError::InvalidInput(format!(
                "Record {} repeats the title '{}' of record {}.",
                i, title, first
            )));
        }

        records.push(BookRecord {
            title,
            short_summary,
            full_summary: non_blank(raw.full_summary),
            themes: raw.themes,
        });
    }

    Ok(records)
}

/// Compact text used both for embedding and as retrieval context.
pub fn build_document(record: &BookRecord) -> String {
    let mut parts = vec![format!("Title: {}", record.title), record.short_summary.clone()];
    if !record.themes.is_empty() {
        parts.push(format!("Themes: {}", record.themes.join(", ")));
    }
    parts.join("\n")
}
