use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use alexandria_model::{Capability, CoverSize, CoverSource, Isbn, ProviderType};

use crate::error::Result;

/// Immutable per-call context threaded through every provider/orchestrator
/// invocation.
#[derive(Clone, Debug)]
pub struct ServiceContext {
    pub request_id: String,
    pub cache_strategy: CacheStrategy,
    pub rate_limit_strategy: RateLimitStrategy,
    pub timeout_ms: Option<u64>,
    pub metadata: HashMap<String, String>,
}

impl ServiceContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            cache_strategy: CacheStrategy::ReadWrite,
            rate_limit_strategy: RateLimitStrategy::Enforce,
            timeout_ms: None,
            metadata: HashMap::new(),
        }
    }

    /// Derives a child context narrowed to `timeout_ms`, used by
    /// orchestrators to bound a single provider attempt.
    pub fn with_timeout(&self, timeout_ms: u64) -> Self {
        let mut child = self.clone();
        child.timeout_ms = Some(timeout_ms);
        child
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStrategy {
    ReadWrite,
    ReadOnly,
    WriteOnly,
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitStrategy {
    Enforce,
    LogOnly,
    Disabled,
}

/// Base surface every provider implements regardless of which capability
/// traits it also satisfies.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    fn provider_type(&self) -> ProviderType;
    fn capabilities(&self) -> &[Capability];

    /// True iff required secrets/keys are present and, for paid providers,
    /// quota is not exhausted.
    async fn is_available(&self) -> bool;

    fn declares(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IsbnResolution {
    pub isbn: Option<Isbn>,
    pub confidence: u8,
    pub source: String,
    pub metadata: Option<serde_json::Value>,
}

#[async_trait]
pub trait IsbnResolver: Provider {
    /// Search -> Validate: candidates are fetched and only accepted once
    /// their own metadata passes the title/author similarity gate. Never
    /// returns an unvalidated ISBN.
    async fn resolve_isbn(
        &self,
        title: &str,
        author: &str,
        ctx: &ServiceContext,
    ) -> Result<IsbnResolution>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    pub subtitle: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<String>,
    pub page_count: Option<i32>,
    pub language: Option<String>,
    pub format: Option<String>,
    pub description: Option<String>,
    pub subject_tags: Vec<String>,
    pub external_ids: HashMap<String, String>,
}

#[async_trait]
pub trait MetadataProvider: Provider {
    async fn fetch_metadata(&self, isbn: &Isbn, ctx: &ServiceContext) -> Result<Option<BookMetadata>>;

    /// Default batch implementation issues sequential fetches; providers
    /// with a native batch endpoint should override this.
    async fn batch_fetch_metadata(
        &self,
        isbns: &[Isbn],
        ctx: &ServiceContext,
    ) -> Result<HashMap<Isbn, BookMetadata>> {
        let mut out = HashMap::with_capacity(isbns.len());
        for isbn in isbns {
            if let Some(meta) = self.fetch_metadata(isbn, ctx).await? {
                out.insert(isbn.clone(), meta);
            }
        }
        Ok(out)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoverResult {
    pub url: String,
    pub source: CoverSource,
    pub size: Option<CoverSize>,
}

#[async_trait]
pub trait CoverProvider: Provider {
    async fn fetch_cover(&self, isbn: &Isbn, ctx: &ServiceContext) -> Result<Option<CoverResult>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublicDomainReason {
    PublicationDate,
    CopyrightExpiration,
    ExplicitLicense,
    ApiVerified,
    Unknown,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicDomainResult {
    pub is_public_domain: bool,
    pub confidence: u8,
    pub reason: PublicDomainReason,
    pub copyright_expiry: Option<DateTime<Utc>>,
    pub download_url: Option<String>,
}

#[async_trait]
pub trait PublicDomainProvider: Provider {
    async fn check_public_domain(
        &self,
        isbn: &Isbn,
        ctx: &ServiceContext,
    ) -> Result<Option<PublicDomainResult>>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratedBook {
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub format: Option<String>,
    pub year: Option<i32>,
    pub significance: Option<String>,
}

/// Closed registry of prompt variants. Rejecting unknown names protects
/// against prompt injection via user-supplied variant strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptVariant {
    Baseline,
    DiversityEmphasis,
    OverlookedSignificance,
    GenreRotation,
    EraContextualized,
    Annual,
}

impl PromptVariant {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "baseline" => Some(Self::Baseline),
            "diversity-emphasis" => Some(Self::DiversityEmphasis),
            "overlooked-significance" => Some(Self::OverlookedSignificance),
            "genre-rotation" => Some(Self::GenreRotation),
            "era-contextualized" => Some(Self::EraContextualized),
            "annual" => Some(Self::Annual),
            _ => None,
        }
    }
}

#[async_trait]
pub trait BookGenerator: Provider {
    async fn generate_books(
        &self,
        prompt: PromptVariant,
        count: u32,
        ctx: &ServiceContext,
    ) -> Result<Vec<GeneratedBook>>;
}

#[async_trait]
pub trait AuthorBiographyProvider: Provider {
    async fn fetch_author_biography(
        &self,
        author_name: &str,
        wikidata_qid: Option<&str>,
        ctx: &ServiceContext,
    ) -> Result<Option<String>>;
}

/// One book as listed in a provider's author-bibliography response. Carries
/// enough to mint an edition/work without a second metadata round-trip.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BibliographyBook {
    pub isbn: Option<Isbn>,
    pub title: String,
    pub cover_url: Option<String>,
}

#[async_trait]
pub trait AuthorBibliographyProvider: Provider {
    /// Lists books credited to `author_name`. `page` is 1-indexed; providers
    /// with no pagination concept should ignore it beyond page 1.
    async fn fetch_author_bibliography(
        &self,
        author_name: &str,
        page: u32,
        ctx: &ServiceContext,
    ) -> Result<Vec<BibliographyBook>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_prompt_variant() {
        assert!(PromptVariant::parse("'; DROP TABLE works;--").is_none());
        assert!(PromptVariant::parse("baseline").is_some());
    }
}
