//! Author-harvest workflow: selects a tiered or curated slice of authors,
//! pages each one's bibliography from the paid provider, and mints/updates
//! editions, works, and author links through the dedup engine. Splits into
//! sub-batches so a single invocation stays inside the environment's
//! subrequest budget; on quota exhaustion it stops mid-run and reports
//! `next_offset` so the caller can chain a follow-up invocation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use alexandria_config::HarvestConfig;
use alexandria_contracts::providers::{AuthorBibliographyProvider, ServiceContext};
use alexandria_contracts::queue::{CoverJob, JobKind, JobPayload, JobPriority, QueueService};
use alexandria_contracts::quota::QuotaManager;
use alexandria_contracts::workflow::{AuthorTier, HarvestBatchSummary, HarvestRequest, HarvestSummary};
use alexandria_model::{Author, Edition, ProviderType, WorkAuthorLink};

use crate::dedup::{ResolutionCache, WorkResolutionRepository, WorkResolver};
use crate::error::{CoreError, Result};
use crate::persistence::PostgresAdapters;
use crate::providers::ProviderSet;
use crate::service_context::RequestEnv;

/// Delay between authors within a sub-batch, respecting the paid provider's
/// rate limit without a dedicated per-call throttle in the workflow step.
const AUTHOR_DELAY: Duration = Duration::from_millis(250);

pub struct AuthorHarvestRunner {
    pub env: RequestEnv,
    pub providers: Arc<ProviderSet>,
    pub resolver: Arc<dyn WorkResolutionRepository>,
    pub adapters: Arc<PostgresAdapters>,
    pub queue: Arc<dyn QueueService>,
    pub config: HarvestConfig,
}

impl AuthorHarvestRunner {
    fn quota(&self) -> &Arc<dyn QuotaManager> {
        self.env.quota.as_ref().expect("author harvest requires a quota manager")
    }

    async fn quota_available(&self) -> Result<bool> {
        self.quota()
            .can_make_calls(1)
            .await
            .map_err(|e| CoreError::Provider(e.to_string()))
    }

    pub async fn run(&self, request: &HarvestRequest) -> Result<HarvestSummary> {
        let authors = self.select_authors(request).await?;
        let base_offset = base_offset(request);
        let max_pages = request.max_pages_per_author.unwrap_or(1).max(1);

        let mut summary = HarvestSummary::empty();
        let sub_batch_size = self.config.sub_batch_size.max(1);

        for (batch_index, chunk) in authors.chunks(sub_batch_size).enumerate() {
            let batch = self.run_batch(batch_index, chunk, max_pages).await?;
            let offset_after = base_offset + ((batch_index + 1) * sub_batch_size) as i64;
            let exhausted = batch.quota_exhausted;
            summary.record_batch(batch, offset_after);
            if exhausted {
                break;
            }
        }

        info!(
            authors_processed = summary.authors_processed,
            editions_created = summary.editions_created,
            editions_updated = summary.editions_updated,
            status = ?summary.status,
            "author harvest run complete"
        );
        Ok(summary)
    }

    /// Ad hoc harvest for one author by name, not necessarily already
    /// present in the `authors` table. Backs the single-author
    /// enrich-bibliography entry point rather than the tiered/curated batch
    /// workflow.
    pub async fn harvest_single_author(&self, author_name: &str, max_books: Option<u32>) -> Result<HarvestBatchSummary> {
        let mut cache = ResolutionCache::new();
        let resolver = WorkResolver::new(self.resolver.as_ref());
        let author_key = resolver.resolve_author(&mut cache, author_name).await?;
        self.adapters.find_or_create_author(&author_key, author_name).await?;
        let author = Author::new(author_key, author_name.to_string());

        let max_pages = if max_books.is_some() { 10 } else { 1 };
        let mut batch = HarvestBatchSummary::default();
        self.harvest_author(&author, max_pages, max_books, &mut batch).await?;
        Ok(batch)
    }

    async fn select_authors(&self, request: &HarvestRequest) -> Result<Vec<Author>> {
        if request.tier == AuthorTier::Curated {
            if let Some(names) = &request.curated_authors {
                return self.adapters.list_authors_by_names(names).await;
            }
            if let Some(list_name) = &request.curated_list_name {
                let names = self
                    .adapters
                    .get_curated_author_list(list_name)
                    .await?
                    .ok_or_else(|| CoreError::Internal(format!("no curated author list named {list_name}")))?;
                return self.adapters.list_authors_by_names(&names).await;
            }
            return Err(CoreError::Internal(
                "curated tier requires curated_authors or curated_list_name".to_string(),
            ));
        }

        let (default_offset, default_limit) = request
            .tier
            .default_range()
            .expect("non-curated tiers declare a default rank range");
        let offset = request.offset.unwrap_or(default_offset);
        let limit = request
            .limit
            .unwrap_or(default_limit)
            .min(self.config.max_authors_per_invocation as i64);
        self.adapters.list_authors_by_rank(offset, limit).await
    }

    async fn run_batch(&self, batch_index: usize, authors: &[Author], max_pages: u32) -> Result<HarvestBatchSummary> {
        let mut batch = HarvestBatchSummary { batch_index, ..Default::default() };

        for (i, author) in authors.iter().enumerate() {
            if !self.quota_available().await? {
                batch.quota_exhausted = true;
                break;
            }

            if i > 0 {
                tokio::time::sleep(AUTHOR_DELAY).await;
            }

            if let Err(err) = self.harvest_author(author, max_pages, None, &mut batch).await {
                warn!(author_key = %author.author_key.as_str(), %err, "author harvest step failed, continuing batch");
            }
        }

        Ok(batch)
    }

    /// Harvests a single author's bibliography, used both per-author within
    /// a tiered/curated batch and by the single-author ad hoc entry point.
    /// `max_books` caps the total editions touched across every page.
    async fn harvest_author(&self, author: &Author, max_pages: u32, max_books: Option<u32>, batch: &mut HarvestBatchSummary) -> Result<()> {
        let ctx = ServiceContext::new(format!("harvest-{}", author.author_key.as_str()));
        let providers = self.providers.author_bibliography_providers();
        let Some((_, provider)) = providers.first() else {
            return Ok(());
        };

        let mut cache = ResolutionCache::new();
        let resolver = WorkResolver::new(self.resolver.as_ref());

        for page in 1..=max_pages {
            if page > 1 && !self.quota_available().await? {
                batch.quota_exhausted = true;
                break;
            }

            let books = provider
                .fetch_author_bibliography(&author.name, page, &ctx)
                .await
                .map_err(|e| CoreError::Provider(e.to_string()))?;
            if books.is_empty() {
                break;
            }

            for book in &books {
                if let Some(cap) = max_books {
                    if (batch.editions_created + batch.editions_updated) as u32 >= cap {
                        batch.authors_processed += 1;
                        return Ok(());
                    }
                }
                let Some(isbn) = &book.isbn else { continue };

                let existing = self.adapters.get_existing_edition(isbn).await?;
                match existing {
                    None => {
                        let work_key = resolver
                            .resolve_work(&mut cache, Some(isbn), &book.title, &[author.name.clone()])
                            .await?;
                        let work_existing = self.adapters.get_existing_work(&work_key).await?;
                        self.adapters.find_or_create_work(&work_key, &book.title).await?;
                        if work_existing.is_none() {
                            batch.works_created += 1;
                        }

                        let edition = Edition::new(isbn.clone(), book.title.clone(), work_key.clone());
                        self.adapters.enrich_edition(edition, Some(ProviderType::Paid), false, 0).await?;
                        batch.editions_created += 1;

                        self.adapters
                            .link_work_to_author(&WorkAuthorLink::new(work_key.clone(), author.author_key.clone(), 1))
                            .await?;

                        if let Some(cover_url) = &book.cover_url {
                            self.enqueue_cover(isbn.as_str(), Some(work_key), cover_url, &book.title, &author.name)
                                .await?;
                            batch.covers_queued += 1;
                        }
                    }
                    Some(edition) => {
                        let needs_cover_upgrade = !edition.cover_source.map(|s| s.is_object_stored()).unwrap_or(false);
                        if needs_cover_upgrade {
                            if let Some(cover_url) = &book.cover_url {
                                self.enqueue_cover(isbn.as_str(), Some(edition.work_key.clone()), cover_url, &book.title, &author.name)
                                    .await?;
                                batch.editions_updated += 1;
                                batch.covers_queued += 1;
                            }
                        }
                    }
                }
            }

            batch.authors_processed += 1;
        }

        Ok(())
    }

    async fn enqueue_cover(
        &self,
        isbn: &str,
        work_key: Option<alexandria_model::WorkKey>,
        provider_url: &str,
        title: &str,
        author: &str,
    ) -> Result<()> {
        let isbn = alexandria_model::Isbn::parse(isbn).map_err(CoreError::Model)?;
        self.queue
            .enqueue(
                JobKind::Cover,
                JobPayload::Cover(CoverJob {
                    isbn,
                    work_key,
                    provider_url: Some(provider_url.to_string()),
                    priority: JobPriority::Low,
                    source: Some("author-harvest".to_string()),
                    title: Some(title.to_string()),
                    author: Some(author.to_string()),
                }),
                JobPriority::Low,
            )
            .await
            .map_err(|e| CoreError::Internal(e.to_string()))
    }
}

fn base_offset(request: &HarvestRequest) -> i64 {
    if request.tier == AuthorTier::Curated {
        return 0;
    }
    request
        .offset
        .unwrap_or_else(|| request.tier.default_range().map(|(offset, _)| offset).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(tier: AuthorTier, offset: Option<i64>) -> HarvestRequest {
        HarvestRequest {
            tier,
            offset,
            limit: None,
            max_pages_per_author: None,
            curated_authors: None,
            curated_list_name: None,
        }
    }

    #[test]
    fn base_offset_defaults_to_tier_range_start() {
        assert_eq!(base_offset(&request(AuthorTier::Top100, None)), 0);
        assert_eq!(base_offset(&request(AuthorTier::Tier1000To5000, None)), 1000);
    }

    #[test]
    fn base_offset_honors_explicit_offset() {
        assert_eq!(base_offset(&request(AuthorTier::Top1000, Some(250))), 250);
    }

    #[test]
    fn base_offset_is_zero_for_curated_regardless_of_offset() {
        assert_eq!(base_offset(&request(AuthorTier::Curated, Some(500))), 0);
    }
}
