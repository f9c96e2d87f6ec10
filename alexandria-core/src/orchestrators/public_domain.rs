//! Public-domain check: queries every available provider, then prefers
//! `api-verified` results over heuristic `publication-date` ones; within a
//! tier, higher confidence wins. If exactly one provider succeeds, its
//! result is taken regardless of tier.

use std::sync::Arc;

use alexandria_contracts::analytics::AnalyticsSink;
use alexandria_contracts::providers::{PublicDomainProvider, PublicDomainReason, PublicDomainResult, ServiceContext};
use alexandria_model::Isbn;

use crate::error::Result;

use super::{record_fallback, timed_attempt, Attempt, DEFAULT_PROVIDER_TIMEOUT};

fn reason_rank(reason: PublicDomainReason) -> u8 {
    match reason {
        PublicDomainReason::ApiVerified => 3,
        PublicDomainReason::ExplicitLicense => 2,
        PublicDomainReason::CopyrightExpiration => 1,
        PublicDomainReason::PublicationDate => 1,
        PublicDomainReason::Unknown => 0,
    }
}

pub async fn check_public_domain(
    providers: &[(&str, Arc<dyn PublicDomainProvider>)],
    isbn: &Isbn,
    ctx: &ServiceContext,
    analytics: Arc<dyn AnalyticsSink>,
) -> Result<Option<PublicDomainResult>> {
    let mut attempts: Vec<Attempt> = Vec::new();
    let mut results: Vec<(String, PublicDomainResult)> = Vec::new();

    for (name, provider) in providers {
        let child_ctx = ctx.with_timeout(DEFAULT_PROVIDER_TIMEOUT.as_millis() as u64);
        let attempt_fut = async {
            tokio::time::timeout(DEFAULT_PROVIDER_TIMEOUT, provider.check_public_domain(isbn, &child_ctx))
                .await
                .map_err(|_| "provider timeout".to_string())?
                .map_err(|e| e.to_string())
        };

        let (result, attempt) = timed_attempt::<PublicDomainResult, _>(name, attempt_fut).await;
        attempts.push(attempt);

        if let Some(result) = result {
            results.push((name.to_string(), result));
        }
    }

    let best = results.into_iter().max_by(|(_, a), (_, b)| {
        reason_rank(a.reason)
            .cmp(&reason_rank(b.reason))
            .then(a.confidence.cmp(&b.confidence))
    });

    let successful_provider = best.as_ref().map(|(name, _)| name.clone());

    record_fallback(
        analytics,
        "public_domain",
        "check_public_domain",
        &attempts,
        successful_provider.as_deref(),
    );

    Ok(best.map(|(_, result)| result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_verified_outranks_publication_date_regardless_of_confidence() {
        assert!(reason_rank(PublicDomainReason::ApiVerified) > reason_rank(PublicDomainReason::PublicationDate));
    }
}
