//! Author queue consumer: enriches one author's biography from the free
//! providers (Wikidata/Wikipedia today; ISBNdb stays in the chain in case
//! its catalog ever gains prose bios) and records which provider supplied
//! it.

use std::sync::Arc;

use tracing::warn;

use alexandria_contracts::providers::ServiceContext;
use alexandria_contracts::queue::{AuthorJob, JobLease, JobOutcome, JobPayload};

use crate::orchestrators::author_biography::fetch_author_biography;
use crate::persistence::PostgresAdapters;
use crate::providers::ProviderSet;
use crate::service_context::RequestEnv;

pub struct AuthorConsumerDeps {
    pub env: RequestEnv,
    pub providers: Arc<ProviderSet>,
    pub adapters: Arc<PostgresAdapters>,
}

pub async fn handle_author_job(deps: Arc<AuthorConsumerDeps>, lease: JobLease) -> JobOutcome {
    let JobPayload::Author(job) = lease.payload else {
        return JobOutcome::PermanentFailure { error: Some("wrong payload for author queue".to_string()) };
    };

    match process(&deps, &job).await {
        Ok(()) => JobOutcome::Ack,
        Err(err) => {
            warn!(author_key = %job.author_key.as_str(), %err, "author biography job failed");
            JobOutcome::Retry { error: Some(err.to_string()) }
        }
    }
}

async fn process(deps: &AuthorConsumerDeps, job: &AuthorJob) -> crate::error::Result<()> {
    let ctx = ServiceContext::new(format!("author-biography-{}", job.author_key.as_str()));

    // `wikipedia_page_title`, when given, is a more reliable lookup key
    // than the freeform author name the providers would otherwise fall
    // back to.
    let lookup_name = job.wikipedia_page_title.as_deref().unwrap_or(&job.author_name);

    let bio = fetch_author_biography(
        &deps.providers.author_biography_providers(),
        lookup_name,
        job.wikidata_qid.as_deref(),
        &ctx,
        deps.env.analytics.clone(),
    )
    .await?;

    if let Some(bio) = bio {
        deps.adapters.update_author_biography(&job.author_key, &bio, "wikidata").await?;
    }

    Ok(())
}
