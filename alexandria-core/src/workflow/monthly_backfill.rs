//! Monthly AI-backfill workflow: generates a batch of candidate books for
//! (year, month) from the AI book generator, resolves each candidate's ISBN,
//! classifies it against the existing catalog, and — outside `dry_run` —
//! mints new works/editions and queues enrichment for anything genuinely
//! new. `dry_run` performs the same generation and classification but
//! resolves ISBNs through free providers only and skips every write, so it
//! never touches the paid provider's quota.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use alexandria_contracts::providers::ServiceContext;
use alexandria_contracts::queue::{EnrichmentJob, JobKind, JobPayload, JobPriority, QueueService};
use alexandria_contracts::workflow::{BackfillRequest, BackfillSummary};
use alexandria_model::{BackfillLog, Edition, Isbn, Work, WorkKey};

use crate::dedup::{classify_for_backfill, DuplicateClassification, ResolutionCache, WorkResolutionRepository, WorkResolver};
use crate::error::{CoreError, Result};
use crate::orchestrators::book_generation::generate_books;
use crate::orchestrators::isbn_resolution::resolve_isbn;
use crate::persistence::{BackfillLogStore, PostgresAdapters};
use crate::providers::ProviderSet;
use crate::registry::ProviderRegistry;
use crate::service_context::RequestEnv;

const DEFAULT_PROMPT_VARIANT: &str = "baseline";
const DEFAULT_BATCH_SIZE: u32 = 20;

pub struct MonthlyBackfillRunner {
    pub env: RequestEnv,
    pub providers: Arc<ProviderSet>,
    pub registry: Arc<ProviderRegistry>,
    pub resolver: Arc<dyn WorkResolutionRepository>,
    pub adapters: Arc<PostgresAdapters>,
    pub queue: Arc<dyn QueueService>,
    pub backfill_log: Arc<BackfillLogStore>,
}

impl MonthlyBackfillRunner {
    pub async fn run(&self, request: &BackfillRequest) -> Result<BackfillSummary> {
        let started = Instant::now();
        let dry_run = request.dry_run.unwrap_or(false);
        let variant = request.prompt_override.as_deref().unwrap_or(DEFAULT_PROMPT_VARIANT);
        let count = request.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);

        let ctx = ServiceContext::new(format!("backfill-{}-{:02}", request.year, request.month));
        let books = generate_books(&self.providers.book_generators(), variant, count, &ctx, self.env.analytics.clone()).await?;

        let mut summary = BackfillSummary { dry_run, ..Default::default() };
        summary.gemini_books_generated = books.len();

        let resolvers = if dry_run {
            self.providers
                .isbn_resolvers()
                .into_iter()
                .filter(|(name, _)| *name != "isbndb")
                .collect::<Vec<_>>()
        } else {
            self.providers.isbn_resolvers()
        };

        let mut cache = ResolutionCache::new();
        let work_resolver = WorkResolver::new(self.resolver.as_ref());

        for book in &books {
            let resolution = resolve_isbn(
                &self.registry,
                &resolvers,
                &book.title,
                &book.author,
                &ctx,
                self.env.analytics.clone(),
                None,
            )
            .await?;

            let Some(resolution) = resolution else { continue };
            let Some(isbn) = &resolution.isbn else { continue };
            summary.valid_isbns += 1;
            if resolution.source == "isbndb" {
                summary.isbndb_calls += 1;
                summary.quota_used += 1;
            }

            let classification = classify_for_backfill(self.resolver.as_ref(), &book.title, &[book.author.clone()], Some(isbn)).await?;
            match classification {
                DuplicateClassification::ExactDup => summary.exact_dup += 1,
                DuplicateClassification::RelatedDup => summary.related_dup += 1,
                DuplicateClassification::FuzzyDup => summary.fuzzy_dup += 1,
                DuplicateClassification::New => summary.new_isbns += 1,
            }

            if dry_run || classification != DuplicateClassification::New {
                continue;
            }

            self.mint_and_enqueue(&mut cache, &work_resolver, isbn, book).await?;
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;

        let mut log = BackfillLog::new(request.year, request.month, variant);
        log.books_generated = summary.gemini_books_generated as u32;
        log.books_resolved = summary.valid_isbns as u32;
        log.books_unresolved = summary.gemini_books_generated.saturating_sub(summary.valid_isbns) as u32;
        log.books_enriched = summary.new_isbns as u32;
        log.providers_used = resolvers.iter().map(|(name, _)| name.to_string()).collect();
        log.duration_ms = summary.duration_ms;
        log.dry_run = dry_run;
        self.backfill_log.record_batch(&log).await?;

        info!(
            year = request.year,
            month = request.month,
            dry_run,
            generated = summary.gemini_books_generated,
            new_isbns = summary.new_isbns,
            "monthly backfill run complete"
        );
        Ok(summary)
    }

    async fn mint_and_enqueue(
        &self,
        cache: &mut ResolutionCache,
        work_resolver: &WorkResolver<'_>,
        isbn: &Isbn,
        book: &alexandria_contracts::providers::GeneratedBook,
    ) -> Result<()> {
        let work_key = work_resolver.resolve_work(cache, Some(isbn), &book.title, &[book.author.clone()]).await?;
        if self.adapters.get_existing_work(&work_key).await?.is_none() {
            let work = new_ai_work(work_key.clone(), &book.title);
            self.adapters.enrich_work(work, None, false, 0).await?;
        }

        let author_key = work_resolver.resolve_author(cache, &book.author).await?;
        self.adapters.find_or_create_author(&author_key, &book.author).await?;
        self.adapters
            .link_work_to_author(&alexandria_model::WorkAuthorLink::new(work_key.clone(), author_key, 1))
            .await?;

        if self.adapters.get_existing_edition(isbn).await?.is_none() {
            let mut edition = Edition::new(isbn.clone(), book.title.clone(), work_key);
            edition.publisher = book.publisher.clone();
            edition.format = book.format.clone();
            self.adapters.enrich_edition(edition, None, false, 0).await?;
        }

        self.queue
            .enqueue(
                JobKind::Enrichment,
                JobPayload::Enrichment(EnrichmentJob { isbn: isbn.clone(), priority: JobPriority::Low, source: Some("ai-backfill".to_string()) }),
                JobPriority::Low,
            )
            .await
            .map_err(|e| CoreError::Internal(e.to_string()))
    }
}

fn new_ai_work(work_key: WorkKey, title: &str) -> Work {
    Work::new_synthetic_ai(work_key, title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ai_work_is_marked_synthetic() {
        let work = new_ai_work(WorkKey::synthetic_ai("dune", "frank-herbert"), "Dune");
        assert!(work.synthetic);
        assert_eq!(work.completeness_score, 30);
    }
}
