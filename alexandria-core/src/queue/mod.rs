//! Batch consumers for the three queue kinds. Each consumer dequeues one
//! batch, fans messages out across a bounded semaphore, and resolves every
//! lease (ack/retry/dead-letter) before returning a summary — per-message
//! failures never fail the batch.

pub mod author;
pub mod cover;
pub mod enrichment;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use alexandria_contracts::error::Result;
use alexandria_contracts::queue::{JobKind, JobLease, JobOutcome, QueueService, BATCH_CONCURRENCY};

/// Tally of how one batch's leases resolved. Returned even when some
/// messages failed, since a batch never fails wholesale.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct BatchSummary {
    pub dequeued: usize,
    pub acked: usize,
    pub retried: usize,
    pub dead_lettered: usize,
}

/// Dequeues up to `kind.max_batch_size()` messages and runs `handler`
/// against each one concurrently, bounded by `BATCH_CONCURRENCY`.
pub async fn consume_batch<F, Fut>(queue: &Arc<dyn QueueService>, kind: JobKind, handler: F) -> Result<BatchSummary>
where
    F: Fn(JobLease) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = JobOutcome> + Send + 'static,
{
    let leases = queue.dequeue_batch(kind).await?;
    let dequeued = leases.len();
    if leases.is_empty() {
        return Ok(BatchSummary::default());
    }

    let semaphore = Arc::new(Semaphore::new(BATCH_CONCURRENCY));
    let handler = Arc::new(handler);
    let mut tasks = Vec::with_capacity(leases.len());

    for lease in leases {
        let semaphore = semaphore.clone();
        let handler = handler.clone();
        let queue = queue.clone();
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
            let lease_id = lease.lease_id;
            let outcome = handler(lease).await;
            if let Err(err) = queue.resolve(lease_id, outcome.clone()).await {
                warn!(%err, "failed to resolve queue lease");
            }
            outcome
        }));
    }

    let mut summary = BatchSummary { dequeued, ..Default::default() };
    for task in tasks {
        match task.await {
            Ok(JobOutcome::Ack) => summary.acked += 1,
            Ok(JobOutcome::Retry { .. }) => summary.retried += 1,
            Ok(JobOutcome::PermanentFailure { .. }) => summary.dead_lettered += 1,
            Err(err) => warn!(%err, "queue consumer task panicked"),
        }
    }

    info!(?kind, dequeued = summary.dequeued, acked = summary.acked, retried = summary.retried, dead_lettered = summary.dead_lettered, "batch complete");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use alexandria_contracts::queue::{EnrichmentJob, JobPayload, JobPriority};
    use alexandria_model::Isbn;

    use super::*;

    struct StubQueue {
        leases: Mutex<Vec<JobLease>>,
        resolutions: Mutex<Vec<(LeaseId, JobOutcome)>>,
    }

    impl StubQueue {
        fn with_leases(leases: Vec<JobLease>) -> Self {
            StubQueue { leases: Mutex::new(leases), resolutions: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl QueueService for StubQueue {
        async fn enqueue(&self, _kind: JobKind, _payload: JobPayload, _priority: JobPriority) -> Result<()> {
            Ok(())
        }

        async fn dequeue_batch(&self, _kind: JobKind) -> Result<Vec<JobLease>> {
            Ok(std::mem::take(&mut *self.leases.lock().unwrap()))
        }

        async fn resolve(&self, lease_id: LeaseId, outcome: JobOutcome) -> Result<()> {
            self.resolutions.lock().unwrap().push((lease_id, outcome));
            Ok(())
        }

        async fn queue_depth(&self, _kind: JobKind) -> Result<usize> {
            Ok(0)
        }

        async fn dead_letter_depth(&self, _kind: JobKind) -> Result<usize> {
            Ok(0)
        }
    }

    fn lease(lease_id: u64, isbn: &str) -> JobLease {
        JobLease {
            lease_id: LeaseId(lease_id),
            kind: JobKind::Enrichment,
            payload: JobPayload::Enrichment(EnrichmentJob {
                isbn: Isbn::parse(isbn).unwrap(),
                priority: JobPriority::Normal,
                source: None,
            }),
            attempt: 0,
        }
    }

    #[tokio::test]
    async fn empty_batch_short_circuits_without_dequeuing_handler() {
        let queue: Arc<dyn QueueService> = Arc::new(StubQueue::with_leases(Vec::new()));
        let summary = consume_batch(&queue, JobKind::Enrichment, |_lease| async { JobOutcome::Ack }).await.unwrap();
        assert_eq!(summary.dequeued, 0);
        assert_eq!(summary.acked, 0);
    }

    #[tokio::test]
    async fn batch_tallies_ack_retry_and_dead_letter_outcomes() {
        let leases = vec![
            lease(1, "9780143127550"),
            lease(2, "9780143127550"),
            lease(3, "9780143127550"),
        ];
        let queue: Arc<dyn QueueService> = Arc::new(StubQueue::with_leases(leases));

        let summary = consume_batch(&queue, JobKind::Enrichment, |lease| async move {
            match lease.lease_id.0 {
                1 => JobOutcome::Ack,
                2 => JobOutcome::Retry { error: Some("timeout".to_string()) },
                _ => JobOutcome::PermanentFailure { error: Some("not found".to_string()) },
            }
        })
        .await
        .unwrap();

        assert_eq!(summary.dequeued, 3);
        assert_eq!(summary.acked, 1);
        assert_eq!(summary.retried, 1);
        assert_eq!(summary.dead_lettered, 1);
    }
}
