//! `/api/covers/*` and the public `/covers/:isbn/:size` delivery route.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use alexandria_contracts::error::AlexandriaError;
use alexandria_contracts::providers::ServiceContext;
use alexandria_contracts::queue::{CoverJob, JobKind, JobPayload, JobPriority};
use alexandria_core::orchestrators::cover_fetch::fetch_cover;
use alexandria_model::{CoverSource, Isbn, WorkKey};

use crate::errors::ApiError;
use crate::state::AppState;

const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
const PLACEHOLDER_URL: &str = "https://covers.alexandria.internal/placeholder.jpg";

const MAX_COVER_QUEUE_BATCH: usize = 100;

#[derive(Deserialize)]
pub struct CoverQueueItem {
    pub isbn: String,
    pub work_key: Option<String>,
    pub priority: Option<JobPriority>,
    pub source: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
}

#[derive(Deserialize)]
pub struct CoverQueueRequest {
    pub books: Vec<CoverQueueItem>,
}

#[derive(Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

pub async fn queue_covers(State(state): State<AppState>, Json(req): Json<CoverQueueRequest>) -> Result<Json<QueuedResponse>, ApiError> {
    if req.books.len() > MAX_COVER_QUEUE_BATCH {
        return Err(ApiError(AlexandriaError::Validation(format!("batch exceeds the {MAX_COVER_QUEUE_BATCH}-item limit"))));
    }

    let mut payloads = Vec::with_capacity(req.books.len());
    for book in req.books {
        let isbn = Isbn::parse(&book.isbn).map_err(|e| ApiError(AlexandriaError::Validation(e.to_string())))?;
        let work_key = book.work_key.as_deref().map(WorkKey::parse).transpose().map_err(|e| ApiError(AlexandriaError::Validation(e.to_string())))?;
        let priority = book.priority.unwrap_or_default();
        payloads.push((
            JobPayload::Cover(CoverJob { isbn, work_key, provider_url: None, priority, source: book.source, title: book.title, author: book.author }),
            priority,
        ));
    }

    state.queue.enqueue_many(JobKind::Cover, payloads).await?;
    Ok(Json(QueuedResponse { queued: true }))
}

#[derive(Deserialize)]
pub struct CoverProcessRequest {
    pub isbn: String,
    pub provider_url: String,
    pub work_key: Option<String>,
}

#[derive(Serialize)]
pub struct CoverProcessResponse {
    pub success: bool,
    pub small_url: String,
    pub medium_url: String,
    pub large_url: String,
}

/// Synchronous single-cover ingestion: downloads, resizes, stores, and
/// writes the edition's cover fields in one request rather than going
/// through the Cover queue.
pub async fn process_cover(State(state): State<AppState>, Json(req): Json<CoverProcessRequest>) -> Result<Json<CoverProcessResponse>, ApiError> {
    let isbn = Isbn::parse(&req.isbn).map_err(|e| ApiError(AlexandriaError::Validation(e.to_string())))?;

    let bytes = {
        let client = state.http.lock().await;
        client.download_bytes(&req.provider_url, "cover-process").await?
    };
    let bytes = bytes.ok_or_else(|| ApiError(AlexandriaError::Provider(format!("cover download failed for {}", req.provider_url))))?;
    if bytes.is_empty() {
        return Err(ApiError(AlexandriaError::Validation("empty cover response".to_string())));
    }

    let stored = state.covers.store_cover(isbn.as_str(), bytes).await?;

    let Some(mut edition) = state.adapters.get_existing_edition(&isbn).await? else {
        return Err(ApiError(AlexandriaError::NotFound(format!("no edition row for isbn {}", isbn.as_str()))));
    };
    edition.cover_small = Some(stored.small_url.clone());
    edition.cover_medium = Some(stored.medium_url.clone());
    edition.cover_large = Some(stored.large_url.clone());
    edition.cover_original = Some(req.provider_url);
    edition.cover_source = Some(CoverSource::R2);
    state.adapters.enrich_edition(edition, None, false, 0).await?;

    Ok(Json(CoverProcessResponse { success: true, small_url: stored.small_url, medium_url: stored.medium_url, large_url: stored.large_url }))
}

#[derive(Serialize)]
pub struct CoverSizes {
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
}

#[derive(Serialize)]
pub struct CoverStatusResponse {
    pub exists: bool,
    pub format: Option<&'static str>,
    pub sizes: CoverSizes,
    pub uploaded: Option<bool>,
    pub urls: Vec<String>,
}

pub async fn cover_status(State(state): State<AppState>, Path(isbn): Path<String>) -> Result<Json<CoverStatusResponse>, ApiError> {
    let isbn = Isbn::parse(&isbn).map_err(|e| ApiError(AlexandriaError::Validation(e.to_string())))?;
    let edition = state.adapters.get_existing_edition(&isbn).await?;

    let Some(edition) = edition else {
        return Ok(Json(CoverStatusResponse {
            exists: false,
            format: None,
            sizes: CoverSizes { small: None, medium: None, large: None },
            uploaded: None,
            urls: Vec::new(),
        }));
    };

    let urls: Vec<String> = [&edition.cover_small, &edition.cover_medium, &edition.cover_large]
        .into_iter()
        .filter_map(|u| u.clone())
        .collect();

    Ok(Json(CoverStatusResponse {
        exists: edition.has_cover(),
        format: edition.has_cover().then_some("jpeg"),
        sizes: CoverSizes { small: edition.cover_small.clone(), medium: edition.cover_medium.clone(), large: edition.cover_large.clone() },
        uploaded: Some(edition.cover_source.map(|s| s.is_object_stored()).unwrap_or(false)),
        urls,
    }))
}

/// Serves a cover by redirecting to its object-stored URL for the
/// requested size, falling back to a resolved-but-not-yet-stored provider
/// URL, then a placeholder. Always immutable-cacheable: a stored cover
/// never changes shape under a fixed `(isbn, size)` key.
pub async fn serve_cover(State(state): State<AppState>, Path((isbn, size)): Path<(String, String)>) -> Response {
    let url = resolve_cover_url(&state, &isbn, &size).await;
    (
        [(header::CACHE_CONTROL, CACHE_CONTROL)],
        Redirect::temporary(&url.unwrap_or_else(|| PLACEHOLDER_URL.to_string())),
    )
        .into_response()
}

async fn resolve_cover_url(state: &AppState, isbn: &str, size: &str) -> Option<String> {
    let isbn = Isbn::parse(isbn).ok()?;
    if let Some(edition) = state.adapters.get_existing_edition(&isbn).await.ok().flatten() {
        let stored = match size {
            "small" => edition.cover_small,
            "medium" => edition.cover_medium,
            "large" => edition.cover_large,
            _ => None,
        };
        if stored.is_some() {
            return stored;
        }
    }

    let ctx = ServiceContext::new(format!("cover-serve-{}", isbn.as_str()));
    fetch_cover(&state.providers.cover_providers(), &isbn, &ctx, state.analytics.clone())
        .await
        .ok()
        .flatten()
        .map(|cover| cover.url)
}
