use crate::{error::Result, models::BookRecord, services::dataset::load_book_summaries};
use std::{collections::HashMap, path::Path};

pub const SUMMARY_NOT_FOUND: &str = "Nu am găsit rezumatul pentru acest titlu.";

/// Case-insensitive title -> detailed summary lookup over the book source.
#[derive(Debug, Clone, Default)]
pub struct SummaryIndex {
    by_title: HashMap<String, String>,
}

impl SummaryIndex {
    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_records(&load_book_summaries(path)?))
    }

    pub fn from_records(records: &[BookRecord]) -> Self {
        let by_title = records
            .iter()
            .map(|r| (r.title.to_lowercase(), r.detailed_summary().to_string()))
            .collect();
        Self { by_title }
    }

    pub fn get(&self, title: &str) -> Option<&str> {
        self.by_title
            .get(&title.trim().to_lowercase())
            .map(String::as_str)
    }

    /// The summary for `title`, or [`SUMMARY_NOT_FOUND`].
    pub fn get_summary_by_title(&self, title: &str) -> &str {
        self.get(title).unwrap_or(SUMMARY_NOT_FOUND)
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }
}
