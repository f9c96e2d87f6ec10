//! In-memory tracker for asynchronously-accepted jobs (currently just the
//! monthly backfill). Not durable across a process restart — the backfill
//! workflow itself re-derives everything from (year, month) on a re-run, so
//! losing an in-flight job's bookkeeping on restart loses visibility, not
//! data.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use alexandria_contracts::workflow::BackfillSummary;

#[derive(Clone, Debug)]
pub enum JobStatus {
    Running,
    Completed(BackfillSummary),
    Failed(String),
}

#[derive(Default, Clone)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<Uuid, JobStatus>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.jobs.write().await.insert(id, JobStatus::Running);
        id
    }

    pub async fn finish(&self, id: Uuid, status: JobStatus) {
        self.jobs.write().await.insert(id, status);
    }

    pub async fn get(&self, id: Uuid) -> Option<JobStatus> {
        self.jobs.read().await.get(&id).cloned()
    }
}
