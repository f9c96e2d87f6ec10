use crate::capability::CoverSource;
use crate::ids::{Isbn, WorkKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A specific published manifestation of a `Work`, identified by ISBN.
///
/// `work_key` must reference an existing `Work` row (minted synthetically if
/// necessary); `cover_source` of `r2`/`alexandria` implies the cover bytes
/// live in object storage rather than at an external URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edition {
    pub isbn: Isbn,
    pub title: String,
    pub subtitle: Option<String>,
    pub publisher: Option<String>,
    /// Publication date, kept as a string since upstream data is frequently
    /// partial ("2014", "Fall 2014").
    pub publication_date: Option<String>,
    pub page_count: Option<i32>,
    pub language: Option<String>,
    pub format: Option<String>,
    pub cover_small: Option<String>,
    pub cover_medium: Option<String>,
    pub cover_large: Option<String>,
    pub cover_original: Option<String>,
    pub cover_source: Option<CoverSource>,
    pub work_key: WorkKey,
    pub primary_provider: Option<String>,
    pub completeness_score: i32,
    /// format -> ISBN, used by dedup's `related_dup` classification.
    pub related_isbns: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Edition {
    pub fn new(isbn: Isbn, title: String, work_key: WorkKey) -> Self {
        let now = Utc::now();
        Self {
            isbn,
            title,
            subtitle: None,
            publisher: None,
            publication_date: None,
            page_count: None,
            language: None,
            format: None,
            cover_small: None,
            cover_medium: None,
            cover_large: None,
            cover_original: None,
            cover_source: None,
            work_key,
            primary_provider: None,
            completeness_score: 0,
            related_isbns: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_cover(&self) -> bool {
        self.cover_large.is_some() || self.cover_medium.is_some() || self.cover_small.is_some()
    }
}
