//! Scenario tests for the free-first/paid-last orchestrator, expressed
//! against hand-rolled stub providers rather than a live Postgres/Redis.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use alexandria_contracts::analytics::{AnalyticsSink, NullAnalyticsSink};
use alexandria_contracts::error::{AlexandriaError, Result};
use alexandria_contracts::providers::{BookMetadata, MetadataProvider, Provider, ServiceContext};
use alexandria_core::orchestrators::metadata_enrichment::fetch_metadata;
use alexandria_model::{Capability, Isbn, ProviderType};

struct StubMetadataProvider {
    name: &'static str,
    provider_type: ProviderType,
    calls: AtomicUsize,
    result: StubResult,
}

enum StubResult {
    Found(BookMetadata),
    Empty,
    Error,
}

impl StubMetadataProvider {
    fn new(name: &'static str, provider_type: ProviderType, result: StubResult) -> Self {
        StubMetadataProvider { name, provider_type, calls: AtomicUsize::new(0), result }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for StubMetadataProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::MetadataEnrichment]
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[async_trait]
impl MetadataProvider for StubMetadataProvider {
    async fn fetch_metadata(&self, _isbn: &Isbn, _ctx: &ServiceContext) -> Result<Option<BookMetadata>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            StubResult::Found(meta) => Ok(Some(meta.clone())),
            StubResult::Empty => Ok(None),
            StubResult::Error => Err(AlexandriaError::Provider(format!("{} unavailable", self.name))),
        }
    }
}

fn metadata(title: &str) -> BookMetadata {
    BookMetadata {
        title: title.to_string(),
        subtitle: None,
        publisher: None,
        publication_date: None,
        page_count: None,
        language: None,
        format: None,
        description: None,
        subject_tags: Vec::new(),
        external_ids: Default::default(),
    }
}

fn ctx() -> ServiceContext {
    ServiceContext::new("test")
}

fn analytics() -> Arc<dyn AnalyticsSink> {
    Arc::new(NullAnalyticsSink)
}

#[tokio::test]
async fn stops_at_first_free_provider_that_returns_metadata() {
    let free = Arc::new(StubMetadataProvider::new("openlibrary", ProviderType::Free, StubResult::Found(metadata("Dune"))));
    let paid = Arc::new(StubMetadataProvider::new("isbndb", ProviderType::Paid, StubResult::Found(metadata("Dune (paid)"))));

    let providers: Vec<(&str, Arc<dyn MetadataProvider>)> = vec![(free.name, free.clone()), (paid.name, paid.clone())];
    let isbn = Isbn::parse("9780441013593").unwrap();

    let result = fetch_metadata(&providers, &isbn, &ctx(), analytics()).await.unwrap();

    assert_eq!(result.unwrap().title, "Dune");
    assert_eq!(free.calls(), 1);
    assert_eq!(paid.calls(), 0, "paid provider must not be consulted once a free one succeeds");
}

#[tokio::test]
async fn falls_through_to_paid_provider_when_free_ones_fail_or_miss() {
    let empty = Arc::new(StubMetadataProvider::new("openlibrary", ProviderType::Free, StubResult::Empty));
    let erroring = Arc::new(StubMetadataProvider::new("google_books", ProviderType::Free, StubResult::Error));
    let paid = Arc::new(StubMetadataProvider::new("isbndb", ProviderType::Paid, StubResult::Found(metadata("Dune"))));

    let providers: Vec<(&str, Arc<dyn MetadataProvider>)> =
        vec![(empty.name, empty.clone()), (erroring.name, erroring.clone()), (paid.name, paid.clone())];
    let isbn = Isbn::parse("9780441013593").unwrap();

    let result = fetch_metadata(&providers, &isbn, &ctx(), analytics()).await.unwrap();

    assert_eq!(result.unwrap().title, "Dune");
    assert_eq!(empty.calls(), 1);
    assert_eq!(erroring.calls(), 1);
    assert_eq!(paid.calls(), 1);
}

#[tokio::test]
async fn returns_none_when_every_provider_misses() {
    let one = Arc::new(StubMetadataProvider::new("openlibrary", ProviderType::Free, StubResult::Empty));
    let two = Arc::new(StubMetadataProvider::new("isbndb", ProviderType::Paid, StubResult::Error));

    let providers: Vec<(&str, Arc<dyn MetadataProvider>)> = vec![(one.name, one.clone()), (two.name, two.clone())];
    let isbn = Isbn::parse("9780441013593").unwrap();

    let result = fetch_metadata(&providers, &isbn, &ctx(), analytics()).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn no_providers_configured_returns_none_without_panicking() {
    let providers: Vec<(&str, Arc<dyn MetadataProvider>)> = Vec::new();
    let isbn = Isbn::parse("9780441013593").unwrap();
    let result = fetch_metadata(&providers, &isbn, &ctx(), analytics()).await.unwrap();
    assert!(result.is_none());
}

/// Spends a quota unit exactly once per call made, mirroring how the real
/// paid provider's `get()` helper is quota-gated before it ever reaches the
/// HTTP client. A provider whose budget is already spent reports itself
/// unavailable instead of attempting the call.
struct QuotaGatedPaidProvider {
    calls: AtomicUsize,
    budget: AtomicUsize,
}

#[async_trait]
impl Provider for QuotaGatedPaidProvider {
    fn name(&self) -> &str {
        "isbndb"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Paid
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::MetadataEnrichment]
    }

    async fn is_available(&self) -> bool {
        self.budget.load(Ordering::SeqCst) > 0
    }
}

#[async_trait]
impl MetadataProvider for QuotaGatedPaidProvider {
    async fn fetch_metadata(&self, _isbn: &Isbn, _ctx: &ServiceContext) -> Result<Option<BookMetadata>> {
        if self.budget.load(Ordering::SeqCst) == 0 {
            return Err(AlexandriaError::RateLimitExceeded("daily quota exhausted".to_string()));
        }
        self.budget.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(metadata("Dune (paid)")))
    }
}

#[tokio::test]
async fn exhausted_paid_quota_surfaces_as_a_miss_not_a_panic() {
    let paid = Arc::new(QuotaGatedPaidProvider { calls: AtomicUsize::new(0), budget: AtomicUsize::new(0) });
    let providers: Vec<(&str, Arc<dyn MetadataProvider>)> = vec![("isbndb", paid.clone())];
    let isbn = Isbn::parse("9780441013593").unwrap();

    let result = fetch_metadata(&providers, &isbn, &ctx(), analytics()).await.unwrap();

    assert!(result.is_none());
    assert_eq!(paid.calls.load(Ordering::SeqCst), 0);
}

