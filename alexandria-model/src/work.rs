use crate::ids::WorkKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An abstract authorship unit. May be `synthetic` when minted locally
/// during enrichment (AI backfill, unresolved ISBN resolution) rather than
/// sourced from the upstream catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    pub work_key: WorkKey,
    pub title: String,
    pub description: Option<String>,
    pub subject_tags: Vec<String>,
    pub first_publication_year: Option<i32>,
    pub primary_provider: Option<String>,
    pub synthetic: bool,
    pub completeness_score: i32,
    pub cover_large: Option<String>,
    pub original_language: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Work {
    pub fn new(work_key: WorkKey, title: String) -> Self {
        let now = Utc::now();
        Self {
            work_key,
            title,
            description: None,
            subject_tags: Vec::new(),
            first_publication_year: None,
            primary_provider: None,
            synthetic: false,
            completeness_score: 0,
            cover_large: None,
            original_language: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Synthetic work seeded by an AI generator, before ISBN resolution has
    /// been attempted.
    pub fn new_synthetic_ai(work_key: WorkKey, title: String) -> Self {
        let mut w = Self::new(work_key, title);
        w.synthetic = true;
        w.completeness_score = 30;
        w
    }

    /// A synthetic work whose best-effort ISBN resolution failed is
    /// persisted at completeness 40 rather than 30.
    pub fn mark_isbn_resolution_failed(&mut self) {
        if self.synthetic && self.completeness_score < 40 {
            self.completeness_score = 40;
        }
    }

    /// Works below this threshold are candidates for the bounded daily
    /// enhancement pass.
    pub const ENHANCEMENT_THRESHOLD: i32 = 50;

    pub fn needs_enhancement(&self) -> bool {
        self.synthetic && self.completeness_score < Self::ENHANCEMENT_THRESHOLD
    }
}
