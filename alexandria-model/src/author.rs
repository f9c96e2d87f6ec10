use crate::ids::{normalize_author_name, AuthorKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An author, identified by `author_key`. `normalized_name` resolves to at
/// most one `author_key`; enforced by the dedup engine, not by this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub author_key: AuthorKey,
    pub name: String,
    pub normalized_name: String,
    pub gender: Option<String>,
    pub nationality: Option<String>,
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
    pub birth_place: Option<String>,
    pub occupations: Vec<String>,
    pub movements: Vec<String>,
    pub awards: Vec<String>,
    /// External QIDs (e.g. Wikidata) keyed by source.
    pub external_ids: std::collections::HashMap<String, String>,
    pub bio: Option<String>,
    pub bio_source: Option<String>,
    pub view_count: i64,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub heat_score: f64,
    pub wikidata_enriched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Author {
    pub fn new(author_key: AuthorKey, name: String) -> Self {
        let now = Utc::now();
        let normalized_name = normalize_author_name(&name);
        Self {
            author_key,
            name,
            normalized_name,
            gender: None,
            nationality: None,
            birth_date: None,
            death_date: None,
            birth_place: None,
            occupations: Vec::new(),
            movements: Vec::new(),
            awards: Vec::new(),
            external_ids: std::collections::HashMap::new(),
            bio: None,
            bio_source: None,
            view_count: 0,
            last_viewed_at: None,
            heat_score: 0.0,
            wikidata_enriched_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_view(&mut self) {
        self.view_count += 1;
        self.last_viewed_at = Some(Utc::now());
    }
}
