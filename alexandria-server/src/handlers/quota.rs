//! `/api/quota/status`.

use axum::extract::State;
use axum::Json;

use alexandria_contracts::quota::QuotaStatus;

use crate::errors::ApiError;
use crate::state::AppState;

pub async fn quota_status(State(state): State<AppState>) -> Result<Json<QuotaStatus>, ApiError> {
    let status = state.quota.status().await?;
    Ok(Json(status))
}
