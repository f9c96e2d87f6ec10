//! `/api/authors/enrich-bibliography`: ad hoc single-author harvest.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use alexandria_config::HarvestConfig;
use alexandria_contracts::workflow::HarvestBatchSummary;
use alexandria_core::workflow::AuthorHarvestRunner;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct EnrichBibliographyRequest {
    pub author_name: String,
    pub max_books: Option<u32>,
}

pub async fn enrich_bibliography(
    State(state): State<AppState>,
    Json(req): Json<EnrichBibliographyRequest>,
) -> Result<Json<HarvestBatchSummary>, ApiError> {
    let runner = AuthorHarvestRunner {
        env: state.request_env(),
        providers: state.providers.clone(),
        resolver: state.resolver.clone(),
        adapters: state.adapters.clone(),
        queue: state.queue.clone(),
        config: HarvestConfig { max_authors_per_invocation: 1, sub_batch_size: 1, ..state.config.harvest.clone() },
    };

    let summary = runner.harvest_single_author(&req.author_name, req.max_books).await?;
    Ok(Json(summary))
}
