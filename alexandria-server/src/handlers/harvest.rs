//! `/api/harvest/start` (synchronous, subrequest-budget-capped) and
//! `/api/harvest/backfill` (202-accepted, polled via its job id).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use alexandria_contracts::error::AlexandriaError;
use alexandria_contracts::workflow::{BackfillRequest, BackfillSummary, HarvestRequest, HarvestSummary};
use alexandria_core::workflow::{AuthorHarvestRunner, MonthlyBackfillRunner};

use crate::errors::ApiError;
use crate::jobs::JobStatus;
use crate::state::AppState;

pub async fn start_harvest(State(state): State<AppState>, Json(req): Json<HarvestRequest>) -> Result<Json<HarvestSummary>, ApiError> {
    let runner = AuthorHarvestRunner {
        env: state.request_env(),
        providers: state.providers.clone(),
        resolver: state.resolver.clone(),
        adapters: state.adapters.clone(),
        queue: state.queue.clone(),
        config: state.config.harvest.clone(),
    };

    let summary = runner.run(&req).await?;
    Ok(Json(summary))
}

#[derive(Serialize)]
pub struct BackfillAcceptedResponse {
    pub job_id: Uuid,
}

/// Kicks off the monthly backfill in the background and returns 202 with a
/// job id immediately; the run's own duration (AI generation plus a resolve
/// call per candidate) is well past what a caller should block a request
/// thread on.
pub async fn start_backfill(
    State(state): State<AppState>,
    Json(req): Json<BackfillRequest>,
) -> Result<(StatusCode, Json<BackfillAcceptedResponse>), ApiError> {
    let job_id = state.jobs.start().await;

    let jobs = state.jobs.clone();
    let runner = MonthlyBackfillRunner {
        env: state.request_env(),
        providers: state.providers.clone(),
        registry: state.registry.clone(),
        resolver: state.resolver.clone(),
        adapters: state.adapters.clone(),
        queue: state.queue.clone(),
        backfill_log: state.backfill_log.clone(),
    };

    tokio::spawn(async move {
        let status = match runner.run(&req).await {
            Ok(summary) => JobStatus::Completed(summary),
            Err(err) => {
                error!(%job_id, %err, "monthly backfill run failed");
                JobStatus::Failed(err.to_string())
            }
        };
        jobs.finish(job_id, status).await;
    });

    Ok((StatusCode::ACCEPTED, Json(BackfillAcceptedResponse { job_id })))
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BackfillJobResponse {
    Running,
    Completed { summary: BackfillSummary },
    Failed { error: String },
}

pub async fn backfill_job_status(State(state): State<AppState>, Path(job_id): Path<Uuid>) -> Result<Json<BackfillJobResponse>, ApiError> {
    let status = state.jobs.get(job_id).await.ok_or_else(|| ApiError(AlexandriaError::NotFound(format!("no backfill job {job_id}"))))?;

    Ok(Json(match status {
        JobStatus::Running => BackfillJobResponse::Running,
        JobStatus::Completed(summary) => BackfillJobResponse::Completed { summary },
        JobStatus::Failed(error) => BackfillJobResponse::Failed { error },
    }))
}
