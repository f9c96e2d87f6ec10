//! Cover queue consumer: downloads a provider cover image (or resolves one
//! via the cover orchestrator when the message didn't carry a URL),
//! resizes it to {small, medium, large}, stores each in object storage, and
//! updates the edition's cover fields. The CPU-heavy step in the pipeline,
//! hence the smallest batch size.

use std::sync::Arc;

use tracing::warn;

use alexandria_contracts::providers::ServiceContext;
use alexandria_contracts::queue::{CoverJob, JobLease, JobOutcome, JobPayload};
use alexandria_model::CoverSource;

use crate::orchestrators::cover_fetch::fetch_cover;
use crate::persistence::{CoverObjectStore, PostgresAdapters};
use crate::providers::ProviderSet;
use crate::service_context::RequestEnv;

pub struct CoverConsumerDeps {
    pub env: RequestEnv,
    pub providers: Arc<ProviderSet>,
    pub adapters: Arc<PostgresAdapters>,
    pub object_store: Arc<dyn CoverObjectStore>,
}

pub async fn handle_cover_job(deps: Arc<CoverConsumerDeps>, lease: JobLease) -> JobOutcome {
    let JobPayload::Cover(job) = lease.payload else {
        return JobOutcome::PermanentFailure { error: Some("wrong payload for cover queue".to_string()) };
    };

    match process(&deps, &job).await {
        Ok(()) => JobOutcome::Ack,
        Err(ProcessError::Permanent(msg)) => {
            warn!(isbn = %job.isbn.as_str(), error = %msg, "cover job permanently invalid");
            JobOutcome::PermanentFailure { error: Some(msg) }
        }
        Err(ProcessError::Recoverable(err)) => {
            warn!(isbn = %job.isbn.as_str(), %err, "cover job failed, will retry");
            JobOutcome::Retry { error: Some(err.to_string()) }
        }
    }
}

enum ProcessError {
    /// Malformed input: acking (not retrying) prevents an infinite loop.
    Permanent(String),
    Recoverable(crate::error::CoreError),
}

impl From<crate::error::CoreError> for ProcessError {
    fn from(err: crate::error::CoreError) -> Self {
        ProcessError::Recoverable(err)
    }
}

async fn process(deps: &CoverConsumerDeps, job: &CoverJob) -> Result<(), ProcessError> {
    let ctx = ServiceContext::new(format!("cover-{}", job.isbn.as_str()));

    let source_url = match &job.provider_url {
        Some(url) => url.clone(),
        None => {
            let resolved = fetch_cover(&deps.providers.cover_providers(), &job.isbn, &ctx, deps.env.analytics.clone()).await?;
            match resolved {
                Some(cover) => cover.url,
                None => return Ok(()),
            }
        }
    };

    let bytes = {
        let client = deps.env.http.lock().await;
        client.download_bytes(&source_url, "cover-queue").await?
    };
    let Some(bytes) = bytes else {
        return Err(ProcessError::Recoverable(crate::error::CoreError::Provider(format!(
            "cover download failed for {source_url}"
        ))));
    };

    if bytes.is_empty() {
        return Err(ProcessError::Permanent(format!("empty cover response from {source_url}")));
    }

    let stored = deps.object_store.store_cover(job.isbn.as_str(), bytes).await.map_err(|e| {
        // A malformed/truncated image never becomes valid on retry; an
        // upload failure (network, bucket hiccup) might.
        let message = e.to_string();
        if message.contains("invalid image") || message.contains("encode failed") {
            ProcessError::Permanent(message)
        } else {
            ProcessError::Recoverable(e)
        }
    })?;

    let Some(mut edition) = deps.adapters.get_existing_edition(&job.isbn).await? else {
        return Err(ProcessError::Permanent(format!("no edition row for isbn {}", job.isbn.as_str())));
    };

    edition.cover_small = Some(stored.small_url);
    edition.cover_medium = Some(stored.medium_url);
    edition.cover_large = Some(stored.large_url);
    edition.cover_original = Some(source_url);
    edition.cover_source = Some(CoverSource::R2);

    deps.adapters.enrich_edition(edition, None, false, 0).await?;
    Ok(())
}
