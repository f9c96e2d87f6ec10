//! Enrichment queue consumer: fetches metadata for a single ISBN, upserts
//! the edition (minting a work if the ISBN is entirely new to the
//! catalog), and queues a Cover follow-up when a provider had an image but
//! the edition's cover isn't object-stored yet.

use std::sync::Arc;

use tracing::warn;

use alexandria_contracts::providers::ServiceContext;
use alexandria_contracts::queue::{CoverJob, EnrichmentJob, JobKind, JobLease, JobOutcome, JobPayload, JobPriority, QueueService};
use alexandria_model::{CoverSource, Edition};

use crate::dedup::{ResolutionCache, WorkResolver, WorkResolutionRepository};
use crate::orchestrators::cover_fetch::fetch_cover;
use crate::orchestrators::metadata_enrichment::fetch_metadata;
use crate::persistence::PostgresAdapters;
use crate::providers::ProviderSet;
use crate::service_context::RequestEnv;

pub struct EnrichmentConsumerDeps {
    pub env: RequestEnv,
    pub providers: Arc<ProviderSet>,
    pub resolver: Arc<dyn WorkResolutionRepository>,
    pub adapters: Arc<PostgresAdapters>,
    pub queue: Arc<dyn QueueService>,
}

pub async fn handle_enrichment_job(deps: Arc<EnrichmentConsumerDeps>, lease: JobLease) -> JobOutcome {
    let JobPayload::Enrichment(job) = lease.payload else {
        return JobOutcome::PermanentFailure { error: Some("wrong payload for enrichment queue".to_string()) };
    };

    match process(&deps, &job).await {
        Ok(()) => JobOutcome::Ack,
        Err(err) => {
            warn!(isbn = %job.isbn.as_str(), %err, "enrichment job failed");
            JobOutcome::Retry { error: Some(err.to_string()) }
        }
    }
}

async fn process(deps: &EnrichmentConsumerDeps, job: &EnrichmentJob) -> crate::error::Result<()> {
    let ctx = ServiceContext::new(format!("enrichment-{}", job.isbn.as_str()));

    let metadata = fetch_metadata(&deps.providers.metadata_providers(), &job.isbn, &ctx, deps.env.analytics.clone()).await?;
    let Some(metadata) = metadata else {
        return Ok(());
    };

    let resolver = WorkResolver::new(deps.resolver.as_ref());
    let mut cache = ResolutionCache::new();
    let work_key = resolver.resolve_work(&mut cache, Some(&job.isbn), &metadata.title, &[]).await?;
    deps.adapters.find_or_create_work(&work_key, &metadata.title).await?;

    let mut edition = Edition::new(job.isbn.clone(), metadata.title.clone(), work_key);
    edition.subtitle = metadata.subtitle;
    edition.publisher = metadata.publisher;
    edition.publication_date = metadata.publication_date;
    edition.page_count = metadata.page_count;
    edition.language = metadata.language;
    edition.format = metadata.format;

    let existing = deps.adapters.get_existing_edition(&job.isbn).await?;
    let needs_cover = existing.as_ref().map(|e| !e.has_cover()).unwrap_or(true);

    deps.adapters.enrich_edition(edition, None, false, metadata.external_ids.len()).await?;

    if needs_cover {
        if let Some(cover) = fetch_cover(&deps.providers.cover_providers(), &job.isbn, &ctx, deps.env.analytics.clone()).await? {
            if !matches!(cover.source, CoverSource::R2 | CoverSource::Alexandria) {
                deps.queue
                    .enqueue(
                        JobKind::Cover,
                        JobPayload::Cover(CoverJob {
                            isbn: job.isbn.clone(),
                            work_key: None,
                            provider_url: Some(cover.url),
                            priority: JobPriority::Normal,
                            source: Some("enrichment-followup".to_string()),
                            title: Some(metadata.title.clone()),
                            author: None,
                        }),
                        JobPriority::Normal,
                    )
                    .await
                    .map_err(|e| crate::error::CoreError::Internal(e.to_string()))?;
            }
        }
    }

    Ok(())
}
