//! Types shared between `alexandria-server`'s harvest/backfill routes and
//! `alexandria-core`'s workflow runners.

use serde::{Deserialize, Serialize};

/// Which slice of the author catalog, ranked by `heat_score`, to harvest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthorTier {
    Top10,
    Top100,
    Top1000,
    #[serde(rename = "1000-5000")]
    Tier1000To5000,
    #[serde(rename = "5000-20000")]
    Tier5000To20000,
    Curated,
}

impl AuthorTier {
    /// Default `(offset, limit)` for rank-ordered tiers. `None` for
    /// `Curated`, which selects by name instead of rank.
    pub fn default_range(self) -> Option<(i64, i64)> {
        match self {
            AuthorTier::Top10 => Some((0, 10)),
            AuthorTier::Top100 => Some((0, 100)),
            AuthorTier::Top1000 => Some((0, 1000)),
            AuthorTier::Tier1000To5000 => Some((1000, 4000)),
            AuthorTier::Tier5000To20000 => Some((5000, 15000)),
            AuthorTier::Curated => None,
        }
    }
}

/// Body of `POST /api/harvest/start`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarvestRequest {
    pub tier: AuthorTier,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub max_pages_per_author: Option<u32>,
    pub curated_authors: Option<Vec<String>>,
    pub curated_list_name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarvestRunStatus {
    Completed,
    Partial,
}

/// Per-sub-batch tally, folded into the grand `HarvestSummary` on completion.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HarvestBatchSummary {
    pub batch_index: usize,
    pub authors_processed: usize,
    pub editions_created: usize,
    pub editions_updated: usize,
    pub works_created: usize,
    pub covers_queued: usize,
    pub quota_exhausted: bool,
}

/// Result of one workflow invocation. `next_offset` is set whenever
/// `status == Partial`, letting the caller chain a follow-up invocation that
/// resumes where this one stopped.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HarvestSummary {
    pub status: HarvestRunStatus,
    pub next_offset: Option<i64>,
    pub authors_processed: usize,
    pub editions_created: usize,
    pub editions_updated: usize,
    pub works_created: usize,
    pub covers_queued: usize,
    pub batches: Vec<HarvestBatchSummary>,
}

impl HarvestSummary {
    pub fn empty() -> Self {
        Self {
            status: HarvestRunStatus::Completed,
            next_offset: None,
            authors_processed: 0,
            editions_created: 0,
            editions_updated: 0,
            works_created: 0,
            covers_queued: 0,
            batches: Vec::new(),
        }
    }

    fn fold_batch(&mut self, batch: HarvestBatchSummary) {
        self.authors_processed += batch.authors_processed;
        self.editions_created += batch.editions_created;
        self.editions_updated += batch.editions_updated;
        self.works_created += batch.works_created;
        self.covers_queued += batch.covers_queued;
        self.batches.push(batch);
    }

    /// Appends a batch's tally and updates status/next_offset if it hit
    /// quota exhaustion. `offset_after_batch` is the rank offset the next
    /// invocation should resume at if this batch is where the run stops.
    pub fn record_batch(&mut self, batch: HarvestBatchSummary, offset_after_batch: i64) {
        let exhausted = batch.quota_exhausted;
        self.fold_batch(batch);
        if exhausted {
            self.status = HarvestRunStatus::Partial;
            self.next_offset = Some(offset_after_batch);
        }
    }
}

/// Body of `POST /api/harvest/backfill`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackfillRequest {
    pub year: i32,
    pub month: u32,
    pub batch_size: Option<u32>,
    pub dry_run: Option<bool>,
    pub experiment_id: Option<String>,
    pub prompt_override: Option<String>,
    pub max_quota: Option<i64>,
}

/// Result of one monthly AI-backfill run. Counts generated candidates
/// through to final classification; `dry_run` runs never advance
/// `isbndb_calls`/`quota_used` since ISBN validation during a dry run uses
/// only free resolvers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BackfillSummary {
    pub gemini_books_generated: usize,
    pub valid_isbns: usize,
    pub new_isbns: usize,
    pub exact_dup: usize,
    pub related_dup: usize,
    pub fuzzy_dup: usize,
    pub isbndb_calls: i64,
    pub quota_used: i64,
    pub duration_ms: u64,
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ranges_cover_declared_tiers() {
        assert_eq!(AuthorTier::Top10.default_range(), Some((0, 10)));
        assert_eq!(AuthorTier::Top1000.default_range(), Some((0, 1000)));
        assert_eq!(AuthorTier::Curated.default_range(), None);
    }

    #[test]
    fn quota_exhaustion_marks_partial_with_next_offset() {
        let mut summary = HarvestSummary::empty();
        summary.record_batch(
            HarvestBatchSummary { batch_index: 0, authors_processed: 10, quota_exhausted: false, ..Default::default() },
            10,
        );
        assert_eq!(summary.status, HarvestRunStatus::Completed);

        summary.record_batch(
            HarvestBatchSummary { batch_index: 1, authors_processed: 10, quota_exhausted: true, ..Default::default() },
            20,
        );
        assert_eq!(summary.status, HarvestRunStatus::Partial);
        assert_eq!(summary.next_offset, Some(20));
        assert_eq!(summary.authors_processed, 20);
    }

    #[test]
    fn backfill_summary_default_is_zeroed_and_not_dry_run() {
        let summary = BackfillSummary::default();
        assert_eq!(summary.gemini_books_generated, 0);
        assert_eq!(summary.isbndb_calls, 0);
        assert!(!summary.dry_run);
    }
}
