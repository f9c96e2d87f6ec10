//! Capability orchestrators: small state machines that compose providers
//! with fallback ordering, per-attempt timeouts, and analytics.
//!
//! Every orchestrator follows *discover → order → attempt → select → emit
//! analytics*. This module holds the shared attempt/ordering/analytics
//! machinery; each capability-specific orchestrator lives in its own file.

pub mod author_biography;
pub mod book_generation;
pub mod cover_fetch;
pub mod isbn_resolution;
pub mod metadata_enrichment;
pub mod public_domain;

use std::sync::Arc;
use std::time::{Duration, Instant};

use alexandria_contracts::analytics::{AnalyticsSink, OrchestratorFallbackEvent};
use alexandria_contracts::providers::Provider;
use alexandria_model::ProviderType;

use crate::analytics::emit_orchestrator_fallback;

/// Default per-provider timeout for cover and metadata orchestrators.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);
/// ISBN resolution involves an extra Search→Validate round trip, hence a
/// longer default.
pub const ISBN_RESOLUTION_TIMEOUT: Duration = Duration::from_secs(15);

/// Records a single attempt against one provider within an orchestration.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub provider: String,
    pub success: bool,
    pub duration: Duration,
    pub error: Option<String>,
}

/// Orders candidates: respects a custom priority list if given (providers
/// absent from it sort last, stable otherwise); defaults to free-first,
/// paid-last, with AI providers excluded unless explicitly requested by the
/// caller (book generation is the only orchestrator that includes them).
pub fn order_providers(
    mut candidates: Vec<Arc<dyn Provider>>,
    custom_priority: Option<&[String]>,
) -> Vec<Arc<dyn Provider>> {
    if let Some(priority) = custom_priority {
        candidates.sort_by_key(|p| {
            priority
                .iter()
                .position(|name| name == p.name())
                .unwrap_or(usize::MAX)
        });
        return candidates;
    }

    candidates.sort_by_key(|p| match p.provider_type() {
        ProviderType::Free => 0,
        ProviderType::Ai => 1,
        ProviderType::Paid => 2,
    });
    candidates
}

/// Emits the fallback analytics event all orchestrators share at the end of
/// an orchestration.
pub fn record_fallback(
    sink: Arc<dyn AnalyticsSink>,
    orchestrator: &str,
    operation: &str,
    attempts: &[Attempt],
    successful_provider: Option<&str>,
) {
    let total_latency: Duration = attempts.iter().map(|a| a.duration).sum();
    emit_orchestrator_fallback(
        sink,
        OrchestratorFallbackEvent {
            orchestrator: orchestrator.to_string(),
            provider_chain: attempts.iter().map(|a| a.provider.clone()).collect(),
            successful_provider: successful_provider.map(str::to_string),
            operation: operation.to_string(),
            attempts_count: attempts.len() as u32,
            total_latency_ms: total_latency.as_millis() as u64,
            success: successful_provider.is_some(),
        },
    );
}

/// Times a future, wrapping its result into an `Attempt` for the given
/// provider name.
pub async fn timed_attempt<T, F>(provider_name: &str, fut: F) -> (Option<T>, Attempt)
where
    F: std::future::Future<Output = Result<Option<T>, String>>,
{
    let start = Instant::now();
    match fut.await {
        Ok(Some(value)) => (
            Some(value),
            Attempt {
                provider: provider_name.to_string(),
                success: true,
                duration: start.elapsed(),
                error: None,
            },
        ),
        Ok(None) => (
            None,
            Attempt {
                provider: provider_name.to_string(),
                success: false,
                duration: start.elapsed(),
                error: None,
            },
        ),
        Err(error) => (
            None,
            Attempt {
                provider: provider_name.to_string(),
                success: false,
                duration: start.elapsed(),
                error: Some(error),
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use alexandria_model::Capability;

    struct FakeProvider {
        name: &'static str,
        provider_type: ProviderType,
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }
        fn provider_type(&self) -> ProviderType {
            self.provider_type
        }
        fn capabilities(&self) -> &[Capability] {
            &[]
        }
        async fn is_available(&self) -> bool {
            true
        }
    }

    #[test]
    fn default_ordering_is_free_first_paid_last() {
        let providers: Vec<Arc<dyn Provider>> = vec![
            Arc::new(FakeProvider { name: "isbndb", provider_type: ProviderType::Paid }),
            Arc::new(FakeProvider { name: "openlibrary", provider_type: ProviderType::Free }),
        ];
        let ordered = order_providers(providers, None);
        assert_eq!(ordered[0].name(), "openlibrary");
        assert_eq!(ordered[1].name(), "isbndb");
    }

    #[test]
    fn custom_priority_overrides_default_ordering() {
        let providers: Vec<Arc<dyn Provider>> = vec![
            Arc::new(FakeProvider { name: "openlibrary", provider_type: ProviderType::Free }),
            Arc::new(FakeProvider { name: "isbndb", provider_type: ProviderType::Paid }),
        ];
        let priority = vec!["isbndb".to_string(), "openlibrary".to_string()];
        let ordered = order_providers(providers, Some(&priority));
        assert_eq!(ordered[0].name(), "isbndb");
    }

    #[test]
    fn providers_absent_from_custom_priority_sort_last() {
        let providers: Vec<Arc<dyn Provider>> = vec![
            Arc::new(FakeProvider { name: "google_books", provider_type: ProviderType::Free }),
            Arc::new(FakeProvider { name: "isbndb", provider_type: ProviderType::Paid }),
        ];
        let priority = vec!["isbndb".to_string()];
        let ordered = order_providers(providers, Some(&priority));
        assert_eq!(ordered[0].name(), "isbndb");
        assert_eq!(ordered[1].name(), "google_books");
    }
}
