use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per (year, month) record of an AI book-generation batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillLog {
    pub year: i32,
    pub month: u32,
    pub books_generated: u32,
    pub books_resolved: u32,
    pub books_unresolved: u32,
    pub books_enriched: u32,
    pub providers_used: Vec<String>,
    pub prompt_variant: String,
    pub duration_ms: u64,
    pub dry_run: bool,
    pub created_at: DateTime<Utc>,
}

impl BackfillLog {
    pub fn new(year: i32, month: u32, prompt_variant: impl Into<String>) -> Self {
        Self {
            year,
            month,
            books_generated: 0,
            books_resolved: 0,
            books_unresolved: 0,
            books_enriched: 0,
            providers_used: Vec::new(),
            prompt_variant: prompt_variant.into(),
            duration_ms: 0,
            dry_run: false,
            created_at: Utc::now(),
        }
    }
}
