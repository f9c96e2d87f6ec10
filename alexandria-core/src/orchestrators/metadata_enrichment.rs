//! Metadata enrichment: free-first, paid-last, stop at first success.

use std::sync::Arc;

use alexandria_contracts::analytics::AnalyticsSink;
use alexandria_contracts::providers::{BookMetadata, MetadataProvider, ServiceContext};
use alexandria_model::Isbn;

use crate::error::Result;

use super::{record_fallback, timed_attempt, Attempt, DEFAULT_PROVIDER_TIMEOUT};

pub async fn fetch_metadata(
    providers: &[(&str, Arc<dyn MetadataProvider>)],
    isbn: &Isbn,
    ctx: &ServiceContext,
    analytics: Arc<dyn AnalyticsSink>,
) -> Result<Option<BookMetadata>> {
    let mut attempts: Vec<Attempt> = Vec::new();
    let mut successful: Option<BookMetadata> = None;
    let mut successful_provider: Option<String> = None;

    for (name, provider) in providers {
        let child_ctx = ctx.with_timeout(DEFAULT_PROVIDER_TIMEOUT.as_millis() as u64);
        let attempt_fut = async {
            tokio::time::timeout(DEFAULT_PROVIDER_TIMEOUT, provider.fetch_metadata(isbn, &child_ctx))
                .await
                .map_err(|_| "provider timeout".to_string())?
                .map_err(|e| e.to_string())
        };

        let (result, attempt) = timed_attempt::<BookMetadata, _>(name, attempt_fut).await;
        attempts.push(attempt);

        if result.is_some() {
            successful_provider = Some(name.to_string());
            successful = result;
            break;
        }
    }

    record_fallback(
        analytics,
        "metadata_enrichment",
        "fetch_metadata",
        &attempts,
        successful_provider.as_deref(),
    );

    Ok(successful)
}
