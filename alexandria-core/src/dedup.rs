//! Deduplication and work/author resolution: maps an incoming
//! (isbn, title, authors) tuple to a canonical `WorkKey`/`AuthorKey`,
//! minting synthetic keys when nothing matches, and classifies
//! AI-generated titles against the existing catalog for monthly backfill
//! runs.

use std::collections::HashMap;

use async_trait::async_trait;
use rand::RngCore;

use alexandria_model::{normalize_author_name, AuthorKey, Isbn, WorkKey};

use crate::error::Result;

/// Minimum trigram similarity for a title match against works by a known
/// author.
pub const TITLE_TRIGRAM_THRESHOLD: f64 = 0.8;
/// Minimum trigram similarity for an author-name fuzzy match.
pub const AUTHOR_TRIGRAM_THRESHOLD: f64 = 0.7;
/// Minimum normalized-Levenshtein ratio for the ISBN-resolver Search→Validate
/// gate (both title and author must clear it).
pub const ISBN_VALIDATION_THRESHOLD: f64 = 0.7;

/// Database-backed lookups the dedup engine needs. Implemented by the
/// Postgres persistence adapter using `pg_trgm`'s `similarity()` for the
/// fuzzy paths; a pure in-memory fake backs unit/scenario tests.
#[async_trait]
pub trait WorkResolutionRepository: Send + Sync {
    async fn work_key_for_isbn(&self, isbn: &Isbn) -> Result<Option<WorkKey>>;

    /// Highest-similarity title match against works credited to any of
    /// `authors`, if it clears `TITLE_TRIGRAM_THRESHOLD`.
    async fn fuzzy_title_match(&self, title: &str, authors: &[String]) -> Result<Option<WorkKey>>;

    async fn exact_title_match(&self, title: &str) -> Result<Option<WorkKey>>;

    async fn author_key_for_normalized_name(&self, normalized_name: &str) -> Result<Option<AuthorKey>>;

    async fn fuzzy_author_match(&self, normalized_name: &str) -> Result<Option<AuthorKey>>;

    /// `related_isbns` values across every edition belonging to works by
    /// `authors`, used by the AI-backfill `related_dup` classification.
    async fn related_isbns_for_authors(&self, authors: &[String]) -> Result<Vec<String>>;
}

/// Per-request memo of already-resolved keys, so a batch doesn't repeat
/// lookups for the same ISBN/author-name.
#[derive(Default)]
pub struct ResolutionCache {
    isbn_to_work: HashMap<Isbn, WorkKey>,
    author_name_to_key: HashMap<String, AuthorKey>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct WorkResolver<'a> {
    repo: &'a dyn WorkResolutionRepository,
}

impl<'a> WorkResolver<'a> {
    pub fn new(repo: &'a dyn WorkResolutionRepository) -> Self {
        Self { repo }
    }

    /// Resolves (isbn, title, authors) to a `WorkKey`, minting a synthetic
    /// one as a last resort. Cascade: ISBN → fuzzy title-by-author →
    /// exact-title → synthetic.
    pub async fn resolve_work(
        &self,
        cache: &mut ResolutionCache,
        isbn: Option<&Isbn>,
        title: &str,
        authors: &[String],
    ) -> Result<WorkKey> {
        if let Some(isbn) = isbn {
            if let Some(key) = cache.isbn_to_work.get(isbn) {
                return Ok(key.clone());
            }
            if let Some(key) = self.repo.work_key_for_isbn(isbn).await? {
                cache.isbn_to_work.insert(isbn.clone(), key.clone());
                return Ok(key);
            }
        }

        if !authors.is_empty() {
            if let Some(key) = self.repo.fuzzy_title_match(title, authors).await? {
                return Ok(key);
            }
        }

        if let Some(key) = self.repo.exact_title_match(title).await? {
            return Ok(key);
        }

        let key = WorkKey::synthetic_isbndb(&random_hex8());
        if let Some(isbn) = isbn {
            cache.isbn_to_work.insert(isbn.clone(), key.clone());
        }
        Ok(key)
    }

    /// Resolves an author name to an `AuthorKey`: exact normalized match,
    /// then fuzzy, then mint synthetic.
    pub async fn resolve_author(&self, cache: &mut ResolutionCache, name: &str) -> Result<AuthorKey> {
        let normalized = normalize_author_name(name);
        if let Some(key) = cache.author_name_to_key.get(&normalized) {
            return Ok(key.clone());
        }

        if let Some(key) = self.repo.author_key_for_normalized_name(&normalized).await? {
            cache.author_name_to_key.insert(normalized, key.clone());
            return Ok(key);
        }

        if let Some(key) = self.repo.fuzzy_author_match(&normalized).await? {
            cache.author_name_to_key.insert(normalized, key.clone());
            return Ok(key);
        }

        let key = AuthorKey::synthetic(&random_hex8());
        cache.author_name_to_key.insert(normalized, key.clone());
        Ok(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateClassification {
    ExactDup,
    RelatedDup,
    FuzzyDup,
    New,
}

/// Classifies a generated (title, author, isbn?) item against the existing
/// catalog for the monthly AI-backfill batch. Dry-run callers use only this
/// classification and skip every write.
pub async fn classify_for_backfill(
    repo: &dyn WorkResolutionRepository,
    title: &str,
    authors: &[String],
    isbn: Option<&Isbn>,
) -> Result<DuplicateClassification> {
    if let Some(isbn) = isbn {
        if repo.work_key_for_isbn(isbn).await?.is_some() {
            return Ok(DuplicateClassification::ExactDup);
        }
        let related = repo.related_isbns_for_authors(authors).await?;
        if related.iter().any(|candidate| candidate == isbn.as_str()) {
            return Ok(DuplicateClassification::RelatedDup);
        }
    }

    if !authors.is_empty() && repo.fuzzy_title_match(title, authors).await?.is_some() {
        return Ok(DuplicateClassification::FuzzyDup);
    }

    Ok(DuplicateClassification::New)
}

/// Normalizes for comparison: lowercase, whitespace-collapsed.
pub fn normalize_for_similarity(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Normalized-Levenshtein ratio in `[0, 1]`, case/whitespace-normalized.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize_for_similarity(a), &normalize_for_similarity(b))
}

/// The ISBN resolver's Search→Validate gate: both title and author must
/// clear `ISBN_VALIDATION_THRESHOLD`.
pub fn passes_validation_gate(fetched_title: &str, query_title: &str, fetched_author: &str, query_author: &str) -> bool {
    similarity_ratio(fetched_title, query_title) >= ISBN_VALIDATION_THRESHOLD
        && similarity_ratio(fetched_author, query_author) >= ISBN_VALIDATION_THRESHOLD
}

fn random_hex8() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRepo {
        isbn_works: Mutex<HashMap<String, WorkKey>>,
        title_works: Mutex<HashMap<String, WorkKey>>,
        authors: Mutex<HashMap<String, AuthorKey>>,
        related: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WorkResolutionRepository for FakeRepo {
        async fn work_key_for_isbn(&self, isbn: &Isbn) -> Result<Option<WorkKey>> {
            Ok(self.isbn_works.lock().unwrap().get(isbn.as_str()).cloned())
        }
        async fn fuzzy_title_match(&self, title: &str, _authors: &[String]) -> Result<Option<WorkKey>> {
            Ok(self.title_works.lock().unwrap().get(&normalize_for_similarity(title)).cloned())
        }
        async fn exact_title_match(&self, title: &str) -> Result<Option<WorkKey>> {
            Ok(self.title_works.lock().unwrap().get(&normalize_for_similarity(title)).cloned())
        }
        async fn author_key_for_normalized_name(&self, name: &str) -> Result<Option<AuthorKey>> {
            Ok(self.authors.lock().unwrap().get(name).cloned())
        }
        async fn fuzzy_author_match(&self, _name: &str) -> Result<Option<AuthorKey>> {
            Ok(None)
        }
        async fn related_isbns_for_authors(&self, _authors: &[String]) -> Result<Vec<String>> {
            Ok(self.related.lock().unwrap().clone())
        }
    }

    #[tokio::test]
    async fn resolves_via_isbn_when_edition_exists() {
        let repo = FakeRepo::default();
        let isbn = Isbn::parse("9780439064873").unwrap();
        repo.isbn_works
            .lock()
            .unwrap()
            .insert(isbn.as_str().to_string(), WorkKey::parse("/works/OL1W").unwrap());

        let resolver = WorkResolver::new(&repo);
        let mut cache = ResolutionCache::new();
        let key = resolver
            .resolve_work(&mut cache, Some(&isbn), "Chamber of Secrets", &[])
            .await
            .unwrap();
        assert_eq!(key.as_str(), "/works/OL1W");
    }

    #[tokio::test]
    async fn mints_synthetic_key_when_nothing_matches() {
        let repo = FakeRepo::default();
        let resolver = WorkResolver::new(&repo);
        let mut cache = ResolutionCache::new();
        let key = resolver
            .resolve_work(&mut cache, None, "An Entirely Unknown Title", &[])
            .await
            .unwrap();
        assert!(key.is_synthetic());
    }

    #[tokio::test]
    async fn backfill_classifies_exact_dup_by_isbn() {
        let repo = FakeRepo::default();
        let isbn = Isbn::parse("9780439064873").unwrap();
        repo.isbn_works
            .lock()
            .unwrap()
            .insert(isbn.as_str().to_string(), WorkKey::parse("/works/OL1W").unwrap());

        let classification = classify_for_backfill(&repo, "title", &[], Some(&isbn)).await.unwrap();
        assert_eq!(classification, DuplicateClassification::ExactDup);
    }

    #[test]
    fn validation_gate_requires_both_thresholds() {
        assert!(passes_validation_gate(
            "Harry Potter and the Chamber of Secrets",
            "harry potter and the chamber of secrets",
            "J. K. Rowling",
            "j k rowling"
        ));
        assert!(!passes_validation_gate(
            "Completely Different Book",
            "Harry Potter and the Chamber of Secrets",
            "J. K. Rowling",
            "J. K. Rowling"
        ));
    }
}
