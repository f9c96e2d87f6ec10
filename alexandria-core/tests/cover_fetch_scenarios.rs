//! Mirrors `metadata_enrichment_scenarios.rs` for the cover orchestrator:
//! free-first, paid-last, stop at first success.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use alexandria_contracts::analytics::{AnalyticsSink, NullAnalyticsSink};
use alexandria_contracts::error::{AlexandriaError, Result};
use alexandria_contracts::providers::{CoverProvider, CoverResult, Provider, ServiceContext};
use alexandria_core::orchestrators::cover_fetch::fetch_cover;
use alexandria_model::{Capability, CoverSource, Isbn, ProviderType};

struct StubCoverProvider {
    name: &'static str,
    provider_type: ProviderType,
    calls: AtomicUsize,
    result: StubResult,
}

enum StubResult {
    Found(&'static str),
    Empty,
    Error,
}

impl StubCoverProvider {
    fn new(name: &'static str, provider_type: ProviderType, result: StubResult) -> Self {
        StubCoverProvider { name, provider_type, calls: AtomicUsize::new(0), result }
    }
}

#[async_trait]
impl Provider for StubCoverProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn provider_type(&self) -> ProviderType {
        self.provider_type
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::CoverImages]
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[async_trait]
impl CoverProvider for StubCoverProvider {
    async fn fetch_cover(&self, _isbn: &Isbn, _ctx: &ServiceContext) -> Result<Option<CoverResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            StubResult::Found(url) => Ok(Some(CoverResult { url: url.to_string(), source: CoverSource::Openlibrary, size: None })),
            StubResult::Empty => Ok(None),
            StubResult::Error => Err(AlexandriaError::Provider(format!("{} unavailable", self.name))),
        }
    }
}

fn ctx() -> ServiceContext {
    ServiceContext::new("test")
}

fn analytics() -> Arc<dyn AnalyticsSink> {
    Arc::new(NullAnalyticsSink)
}

#[tokio::test]
async fn stops_at_first_provider_with_a_cover() {
    let free = Arc::new(StubCoverProvider::new("openlibrary", ProviderType::Free, StubResult::Found("https://covers/free.jpg")));
    let paid = Arc::new(StubCoverProvider::new("isbndb", ProviderType::Paid, StubResult::Found("https://covers/paid.jpg")));

    let providers: Vec<(&str, Arc<dyn CoverProvider>)> = vec![(free.name, free.clone()), (paid.name, paid.clone())];
    let isbn = Isbn::parse("9780441013593").unwrap();

    let result = fetch_cover(&providers, &isbn, &ctx(), analytics()).await.unwrap().unwrap();

    assert_eq!(result.url, "https://covers/free.jpg");
    assert_eq!(paid.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn falls_back_past_errors_and_misses() {
    let erroring = Arc::new(StubCoverProvider::new("openlibrary", ProviderType::Free, StubResult::Error));
    let empty = Arc::new(StubCoverProvider::new("google_books", ProviderType::Free, StubResult::Empty));
    let paid = Arc::new(StubCoverProvider::new("isbndb", ProviderType::Paid, StubResult::Found("https://covers/paid.jpg")));

    let providers: Vec<(&str, Arc<dyn CoverProvider>)> =
        vec![(erroring.name, erroring.clone()), (empty.name, empty.clone()), (paid.name, paid.clone())];
    let isbn = Isbn::parse("9780441013593").unwrap();

    let result = fetch_cover(&providers, &isbn, &ctx(), analytics()).await.unwrap();
    assert_eq!(result.unwrap().url, "https://covers/paid.jpg");
}

#[tokio::test]
async fn no_cover_anywhere_returns_none() {
    let empty = Arc::new(StubCoverProvider::new("openlibrary", ProviderType::Free, StubResult::Empty));
    let providers: Vec<(&str, Arc<dyn CoverProvider>)> = vec![(empty.name, empty.clone())];
    let isbn = Isbn::parse("9780441013593").unwrap();

    let result = fetch_cover(&providers, &isbn, &ctx(), analytics()).await.unwrap();
    assert!(result.is_none());
}
