//! `/api/enrich/*`: direct merge-gated writes, async queueing, and the
//! synchronous paid-batch path.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use alexandria_contracts::providers::ServiceContext;
use alexandria_contracts::queue::{EnrichmentJob, JobKind, JobPayload, JobPriority};
use alexandria_core::dedup::{ResolutionCache, WorkResolver};
use alexandria_core::quality::MergeDecision;
use alexandria_model::{Author, Edition, Isbn, ProviderType, Work, WorkKey};

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct EnrichEditionRequest {
    pub isbn: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<String>,
    pub page_count: Option<i32>,
    pub language: Option<String>,
    pub format: Option<String>,
    pub cover_small: Option<String>,
    pub cover_medium: Option<String>,
    pub cover_large: Option<String>,
    pub external_ids: Option<std::collections::HashMap<String, String>>,
    pub is_user_correction: Option<bool>,
}

#[derive(Deserialize)]
pub struct EnrichWorkRequest {
    pub work_key: String,
    pub title: String,
    pub description: Option<String>,
    pub subject_tags: Option<Vec<String>>,
    pub original_language: Option<String>,
    pub first_publication_year: Option<i32>,
    pub external_ids: Option<std::collections::HashMap<String, String>>,
    pub is_user_correction: Option<bool>,
}

#[derive(Deserialize)]
pub struct EnrichAuthorRequest {
    pub author_key: String,
    pub name: String,
    pub bio: Option<String>,
    pub nationality: Option<String>,
    pub birth_date: Option<String>,
    pub death_date: Option<String>,
    pub birth_place: Option<String>,
    pub occupations: Option<Vec<String>>,
    pub movements: Option<Vec<String>>,
    pub awards: Option<Vec<String>>,
    pub external_ids: Option<std::collections::HashMap<String, String>>,
    pub is_user_correction: Option<bool>,
}

#[derive(Serialize)]
pub struct EnrichResponse {
    pub success: bool,
    pub quality_score: i32,
    pub applied_fields: Vec<&'static str>,
    pub skipped: bool,
}

fn response_for(decision: MergeDecision, score: i32, fields: &'static [&'static str]) -> EnrichResponse {
    let applied_fields = if decision == MergeDecision::Skip { Vec::new() } else { fields.to_vec() };
    EnrichResponse { success: true, quality_score: score, applied_fields, skipped: decision == MergeDecision::Skip }
}

pub async fn enrich_edition(State(state): State<AppState>, Json(req): Json<EnrichEditionRequest>) -> Result<Json<EnrichResponse>, ApiError> {
    let isbn = Isbn::parse(&req.isbn).map_err(|e| ApiError(alexandria_contracts::error::AlexandriaError::Validation(e.to_string())))?;

    let resolver = WorkResolver::new(state.resolver.as_ref());
    let mut cache = ResolutionCache::new();
    let work_key = resolver.resolve_work(&mut cache, Some(&isbn), &req.title, &[]).await?;
    state.adapters.find_or_create_work(&work_key, &req.title).await?;

    let mut edition = Edition::new(isbn, req.title.clone(), work_key);
    edition.subtitle = req.subtitle;
    edition.publisher = req.publisher;
    edition.publication_date = req.publication_date;
    edition.page_count = req.page_count;
    edition.language = req.language;
    edition.format = req.format;
    edition.cover_small = req.cover_small;
    edition.cover_medium = req.cover_medium;
    edition.cover_large = req.cover_large;

    let external_id_count = req.external_ids.map(|m| m.len()).unwrap_or(0);
    let is_user_correction = req.is_user_correction.unwrap_or(false);

    let score = alexandria_core::quality::edition_completeness(&edition, external_id_count);
    let decision = state.adapters.enrich_edition(edition, None, is_user_correction, external_id_count).await?;
    Ok(Json(response_for(
        decision,
        score,
        &["title", "subtitle", "publisher", "publication_date", "page_count", "language", "format", "cover"],
    )))
}

pub async fn enrich_work(State(state): State<AppState>, Json(req): Json<EnrichWorkRequest>) -> Result<Json<EnrichResponse>, ApiError> {
    let work_key = WorkKey::parse(&req.work_key).map_err(|e| ApiError(alexandria_contracts::error::AlexandriaError::Validation(e.to_string())))?;

    let mut work = Work::new(work_key, req.title);
    work.description = req.description;
    work.subject_tags = req.subject_tags.unwrap_or_default();
    work.original_language = req.original_language;
    work.first_publication_year = req.first_publication_year;

    let external_id_count = req.external_ids.map(|m| m.len()).unwrap_or(0);
    let is_user_correction = req.is_user_correction.unwrap_or(false);

    let score = alexandria_core::quality::work_completeness(&work, external_id_count);
    let decision = state.adapters.enrich_work(work, None, is_user_correction, external_id_count).await?;
    Ok(Json(response_for(decision, score, &["description", "subject_tags", "original_language", "first_publication_year"])))
}

pub async fn enrich_author(State(state): State<AppState>, Json(req): Json<EnrichAuthorRequest>) -> Result<Json<EnrichResponse>, ApiError> {
    let author_key =
        alexandria_model::AuthorKey::parse(&req.author_key).map_err(|e| ApiError(alexandria_contracts::error::AlexandriaError::Validation(e.to_string())))?;

    let mut author = Author::new(author_key, req.name);
    author.bio = req.bio;
    author.nationality = req.nationality;
    author.birth_date = req.birth_date;
    author.death_date = req.death_date;
    author.birth_place = req.birth_place;
    author.occupations = req.occupations.unwrap_or_default();
    author.movements = req.movements.unwrap_or_default();
    author.awards = req.awards.unwrap_or_default();

    let external_id_count = req.external_ids.map(|m| m.len()).unwrap_or(0);
    let is_user_correction = req.is_user_correction.unwrap_or(false);

    let score = alexandria_core::quality::author_completeness(&author, external_id_count);
    let decision = state.adapters.enrich_author(author, None, is_user_correction, external_id_count).await?;
    Ok(Json(response_for(decision, score, &["bio", "nationality", "birth_date", "death_date", "birth_place", "occupations", "movements", "awards"])))
}

#[derive(Deserialize)]
pub struct QueueEnrichmentRequest {
    pub isbn: String,
    pub priority: Option<JobPriority>,
}

#[derive(Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

pub async fn enqueue_enrichment(State(state): State<AppState>, Json(req): Json<QueueEnrichmentRequest>) -> Result<Json<QueuedResponse>, ApiError> {
    let isbn = Isbn::parse(&req.isbn).map_err(|e| ApiError(alexandria_contracts::error::AlexandriaError::Validation(e.to_string())))?;
    let priority = req.priority.unwrap_or_default();
    state
        .queue
        .enqueue(JobKind::Enrichment, JobPayload::Enrichment(EnrichmentJob { isbn, priority, source: Some("api".to_string()) }), priority)
        .await?;
    Ok(Json(QueuedResponse { queued: true }))
}

const MAX_QUEUE_BATCH: usize = 100;

#[derive(Deserialize)]
pub struct QueueEnrichmentBatchRequest {
    pub books: Vec<QueueEnrichmentRequest>,
}

pub async fn enqueue_enrichment_batch(
    State(state): State<AppState>,
    Json(req): Json<QueueEnrichmentBatchRequest>,
) -> Result<Json<QueuedResponse>, ApiError> {
    if req.books.len() > MAX_QUEUE_BATCH {
        return Err(ApiError(alexandria_contracts::error::AlexandriaError::Validation(format!(
            "batch exceeds the {MAX_QUEUE_BATCH}-item limit"
        ))));
    }

    let mut payloads = Vec::with_capacity(req.books.len());
    for book in req.books {
        let isbn = Isbn::parse(&book.isbn).map_err(|e| ApiError(alexandria_contracts::error::AlexandriaError::Validation(e.to_string())))?;
        let priority = book.priority.unwrap_or_default();
        payloads.push((JobPayload::Enrichment(EnrichmentJob { isbn, priority, source: Some("api-batch".to_string()) }), priority));
    }

    state.queue.enqueue_many(JobKind::Enrichment, payloads).await?;
    Ok(Json(QueuedResponse { queued: true }))
}

const MAX_BATCH_DIRECT: usize = 1000;

#[derive(Deserialize)]
pub struct BatchDirectRequest {
    pub isbns: Vec<String>,
    pub source: Option<String>,
}

#[derive(Serialize, Default)]
pub struct BatchDirectResponse {
    pub requested: usize,
    pub found: usize,
    pub enriched: usize,
    pub failed: usize,
    pub not_found: usize,
    pub covers_queued: usize,
    pub api_calls: usize,
    pub duration_ms: u64,
}

/// Synchronously calls the paid provider's batch metadata endpoint for up
/// to 1000 ISBNs, writing each result through the same merge gate the
/// async enrichment consumer uses, and enqueueing cover follow-ups for
/// editions that still lack a stored cover.
pub async fn batch_direct(State(state): State<AppState>, Json(req): Json<BatchDirectRequest>) -> Result<Json<BatchDirectResponse>, ApiError> {
    if req.isbns.len() > MAX_BATCH_DIRECT {
        return Err(ApiError(alexandria_contracts::error::AlexandriaError::Validation(format!(
            "batch exceeds the {MAX_BATCH_DIRECT}-item limit"
        ))));
    }

    let started = Instant::now();
    let mut response = BatchDirectResponse { requested: req.isbns.len(), ..Default::default() };

    let mut isbns = Vec::with_capacity(req.isbns.len());
    for raw in &req.isbns {
        match Isbn::parse(raw) {
            Ok(isbn) => isbns.push(isbn),
            Err(_) => response.failed += 1,
        }
    }

    let metadata_by_isbn = alexandria_contracts::providers::MetadataProvider::batch_fetch_metadata(
        state.providers.isbndb.as_ref(),
        &isbns,
        &ServiceContext::new("batch-direct"),
    )
    .await?;
    response.api_calls = 1;

    let resolver = WorkResolver::new(state.resolver.as_ref());
    let mut cache = ResolutionCache::new();

    for isbn in &isbns {
        let Some(metadata) = metadata_by_isbn.get(isbn) else {
            response.not_found += 1;
            continue;
        };
        response.found += 1;

        let work_key = resolver.resolve_work(&mut cache, Some(isbn), &metadata.title, &[]).await?;
        state.adapters.find_or_create_work(&work_key, &metadata.title).await?;

        let existing = state.adapters.get_existing_edition(isbn).await?;
        let needs_cover = existing.as_ref().map(|e| !e.has_cover()).unwrap_or(true);

        let mut edition = Edition::new(isbn.clone(), metadata.title.clone(), work_key.clone());
        edition.subtitle = metadata.subtitle.clone();
        edition.publisher = metadata.publisher.clone();
        edition.publication_date = metadata.publication_date.clone();
        edition.page_count = metadata.page_count;
        edition.language = metadata.language.clone();
        edition.format = metadata.format.clone();

        state
            .adapters
            .enrich_edition(edition, Some(ProviderType::Paid), false, metadata.external_ids.len())
            .await?;
        response.enriched += 1;

        if needs_cover {
            let ctx = ServiceContext::new(format!("batch-direct-{}", isbn.as_str()));
            if let Some(cover) = alexandria_core::orchestrators::cover_fetch::fetch_cover(
                &state.providers.cover_providers(),
                isbn,
                &ctx,
                state.analytics.clone(),
            )
            .await?
            {
                state
                    .queue
                    .enqueue(
                        JobKind::Cover,
                        JobPayload::Cover(alexandria_contracts::queue::CoverJob {
                            isbn: isbn.clone(),
                            work_key: None,
                            provider_url: Some(cover.url),
                            priority: JobPriority::Normal,
                            source: req.source.clone().or_else(|| Some("batch-direct".to_string())),
                            title: Some(metadata.title.clone()),
                            author: None,
                        }),
                        JobPriority::Normal,
                    )
                    .await?;
                response.covers_queued += 1;
            }
        }
    }

    response.duration_ms = started.elapsed().as_millis() as u64;
    Ok(Json(response))
}
