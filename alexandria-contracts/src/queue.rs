use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use alexandria_model::{AuthorKey, Isbn, WorkKey};

use crate::error::Result;

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum JobKind {
    Enrichment,
    Cover,
    Author,
}

impl JobKind {
    /// Maximum messages delivered to a consumer in one batch.
    pub fn max_batch_size(self) -> usize {
        match self {
            JobKind::Enrichment => 10,
            JobKind::Cover => 5,
            JobKind::Author => 10,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobPriority {
    Low,
    Normal,
    High,
}

impl Default for JobPriority {
    fn default() -> Self {
        JobPriority::Normal
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnrichmentJob {
    pub isbn: Isbn,
    pub priority: JobPriority,
    pub source: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoverJob {
    pub isbn: Isbn,
    pub work_key: Option<WorkKey>,
    pub provider_url: Option<String>,
    pub priority: JobPriority,
    pub source: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorJob {
    pub author_key: AuthorKey,
    pub author_name: String,
    pub wikidata_qid: Option<String>,
    pub wikipedia_page_title: Option<String>,
    pub priority: JobPriority,
    pub source: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum JobPayload {
    Enrichment(EnrichmentJob),
    Cover(CoverJob),
    Author(AuthorJob),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Enrichment(_) => JobKind::Enrichment,
            JobPayload::Cover(_) => JobKind::Cover,
            JobPayload::Author(_) => JobKind::Author,
        }
    }
}

/// Maximum recoverable-failure retries before a message is dead-lettered.
pub const MAX_RETRIES: u32 = 3;

/// Bounded concurrency for batch message processing within one consumer
/// invocation.
pub const BATCH_CONCURRENCY: usize = 8;

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct LeaseId(pub u64);

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobLease {
    pub lease_id: LeaseId,
    pub kind: JobKind,
    pub payload: JobPayload,
    pub attempt: u32,
}

/// Disposition a consumer reports for a leased message.
#[derive(Clone, Debug)]
pub enum JobOutcome {
    Ack,
    Retry { error: Option<String> },
    PermanentFailure { error: Option<String> },
}

/// Abstracts the durable queue backend: enqueue/dequeue/retry/DLQ semantics
/// consumed by the batch handlers for each queue kind.
#[async_trait]
pub trait QueueService: Send + Sync {
    async fn enqueue(&self, kind: JobKind, payload: JobPayload, priority: JobPriority) -> Result<()>;

    /// Enqueues multiple jobs of the same kind. Default issues one-by-one;
    /// transactional backends should override for atomicity.
    async fn enqueue_many(&self, kind: JobKind, payloads: Vec<(JobPayload, JobPriority)>) -> Result<()> {
        for (payload, priority) in payloads {
            self.enqueue(kind, payload, priority).await?;
        }
        Ok(())
    }

    /// Dequeues up to `kind.max_batch_size()` ready messages.
    async fn dequeue_batch(&self, kind: JobKind) -> Result<Vec<JobLease>>;

    /// Resolves a leased message per its outcome: ack, reschedule with
    /// backoff (bumping `attempt`, dead-lettering once `attempt >
    /// MAX_RETRIES`), or permanent-failure ack.
    async fn resolve(&self, lease_id: LeaseId, outcome: JobOutcome) -> Result<()>;

    async fn queue_depth(&self, kind: JobKind) -> Result<usize>;

    async fn dead_letter_depth(&self, kind: JobKind) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_sizes_match_per_queue_limits() {
        assert_eq!(JobKind::Enrichment.max_batch_size(), 10);
        assert_eq!(JobKind::Cover.max_batch_size(), 5);
    }
}
