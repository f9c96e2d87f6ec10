//! Author biography: free-first, stop at first success. Distinct from
//! `metadata_enrichment`/`cover_fetch` only in the extra `wikidata_qid` hint
//! threaded through to each provider.

use std::sync::Arc;

use alexandria_contracts::analytics::AnalyticsSink;
use alexandria_contracts::providers::{AuthorBiographyProvider, ServiceContext};

use crate::error::Result;

use super::{record_fallback, timed_attempt, Attempt, DEFAULT_PROVIDER_TIMEOUT};

pub async fn fetch_author_biography(
    providers: &[(&str, Arc<dyn AuthorBiographyProvider>)],
    author_name: &str,
    wikidata_qid: Option<&str>,
    ctx: &ServiceContext,
    analytics: Arc<dyn AnalyticsSink>,
) -> Result<Option<String>> {
    let mut attempts: Vec<Attempt> = Vec::new();
    let mut successful: Option<String> = None;
    let mut successful_provider: Option<String> = None;

    for (name, provider) in providers {
        let child_ctx = ctx.with_timeout(DEFAULT_PROVIDER_TIMEOUT.as_millis() as u64);
        let attempt_fut = async {
            tokio::time::timeout(
                DEFAULT_PROVIDER_TIMEOUT,
                provider.fetch_author_biography(author_name, wikidata_qid, &child_ctx),
            )
            .await
            .map_err(|_| "provider timeout".to_string())?
            .map_err(|e| e.to_string())
        };

        let (result, attempt) = timed_attempt::<String, _>(name, attempt_fut).await;
        attempts.push(attempt);

        if result.is_some() {
            successful_provider = Some(name.to_string());
            successful = result;
            break;
        }
    }

    record_fallback(
        analytics,
        "author_biography",
        "fetch_author_biography",
        &attempts,
        successful_provider.as_deref(),
    );

    Ok(successful)
}
