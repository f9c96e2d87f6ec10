//! Google Books: free (an API key raises the anonymous rate limit but is not
//! required), covers ISBN resolution via the volumes search endpoint plus
//! metadata and cover URLs from the same `volumeInfo` payload.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use alexandria_contracts::error::Result;
use alexandria_contracts::providers::{
    BookMetadata, CoverProvider, CoverResult, IsbnResolution, IsbnResolver, MetadataProvider,
    Provider, ServiceContext,
};
use alexandria_model::{Capability, CoverSize, CoverSource, Isbn, ProviderType};

use crate::dedup::{similarity_ratio, ISBN_VALIDATION_THRESHOLD};
use crate::http_client::{FetchOptions, HttpClient};
use crate::providers::urlencode;

const BASE_URL: &str = "https://www.googleapis.com/books/v1/volumes";

#[derive(Debug, Deserialize, Default)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Debug, Deserialize, Default)]
struct VolumeInfo {
    title: Option<String>,
    subtitle: Option<String>,
    authors: Option<Vec<String>>,
    publisher: Option<String>,
    #[serde(rename = "publishedDate")]
    published_date: Option<String>,
    #[serde(rename = "pageCount")]
    page_count: Option<i32>,
    language: Option<String>,
    description: Option<String>,
    categories: Option<Vec<String>>,
    #[serde(rename = "industryIdentifiers")]
    industry_identifiers: Option<Vec<IndustryIdentifier>>,
    #[serde(rename = "imageLinks")]
    image_links: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

pub struct GoogleBooksProvider {
    api_key: Option<String>,
    http: Arc<tokio::sync::Mutex<HttpClient>>,
}

impl GoogleBooksProvider {
    pub fn new(api_key: Option<String>, http: Arc<tokio::sync::Mutex<HttpClient>>) -> Self {
        Self { api_key, http }
    }

    async fn search(&self, query: &str, ctx: &ServiceContext) -> Result<Vec<Volume>> {
        let mut url = format!("{BASE_URL}?q={}", urlencode(query));
        if let Some(key) = &self.api_key {
            url.push_str(&format!("&key={key}"));
        }

        let mut client = self.http.lock().await;
        let mut opts = FetchOptions::get("google_books", "search");
        opts.rate_limit_ms = 100;
        let response: Option<VolumesResponse> = client.fetch(&url, opts, ctx).await?;
        Ok(response.map(|r| r.items).unwrap_or_default())
    }
}

fn volume_to_metadata(volume_info: &VolumeInfo) -> BookMetadata {
    let mut external_ids = HashMap::new();
    for id in volume_info.industry_identifiers.iter().flatten() {
        external_ids.insert(id.kind.to_lowercase(), id.identifier.clone());
    }

    BookMetadata {
        title: volume_info.title.clone().unwrap_or_default(),
        subtitle: volume_info.subtitle.clone(),
        publisher: volume_info.publisher.clone(),
        publication_date: volume_info.published_date.clone(),
        page_count: volume_info.page_count,
        language: volume_info.language.clone(),
        format: None,
        description: volume_info.description.clone(),
        subject_tags: volume_info.categories.clone().unwrap_or_default(),
        external_ids,
    }
}

#[async_trait]
impl Provider for GoogleBooksProvider {
    fn name(&self) -> &str {
        "google_books"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Free
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::IsbnResolution, Capability::MetadataEnrichment, Capability::CoverImages]
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[async_trait]
impl IsbnResolver for GoogleBooksProvider {
    async fn resolve_isbn(&self, title: &str, author: &str, ctx: &ServiceContext) -> Result<IsbnResolution> {
        let query = format!("intitle:{title} inauthor:{author}");
        let volumes = self.search(&query, ctx).await?;

        let candidate = volumes.into_iter().find(|v| {
            let candidate_title = v.volume_info.title.clone().unwrap_or_default();
            let candidate_author = v.volume_info.authors.clone().unwrap_or_default().join(", ");
            similarity_ratio(&candidate_title, title) >= ISBN_VALIDATION_THRESHOLD
                && similarity_ratio(&candidate_author, author) >= ISBN_VALIDATION_THRESHOLD
        });

        let isbn = candidate.as_ref().and_then(|v| {
            v.volume_info
                .industry_identifiers
                .iter()
                .flatten()
                .find(|id| id.kind == "ISBN_13")
                .or_else(|| v.volume_info.industry_identifiers.iter().flatten().find(|id| id.kind == "ISBN_10"))
                .and_then(|id| Isbn::parse(&id.identifier).ok())
        });

        Ok(IsbnResolution {
            confidence: if isbn.is_some() { 75 } else { 0 },
            isbn,
            source: "google_books".to_string(),
            metadata: None,
        })
    }
}

#[async_trait]
impl MetadataProvider for GoogleBooksProvider {
    async fn fetch_metadata(&self, isbn: &Isbn, ctx: &ServiceContext) -> Result<Option<BookMetadata>> {
        let volumes = self.search(&format!("isbn:{}", isbn.as_str()), ctx).await?;
        Ok(volumes.first().map(|v| volume_to_metadata(&v.volume_info)))
    }
}

#[async_trait]
impl CoverProvider for GoogleBooksProvider {
    async fn fetch_cover(&self, isbn: &Isbn, ctx: &ServiceContext) -> Result<Option<CoverResult>> {
        let volumes = self.search(&format!("isbn:{}", isbn.as_str()), ctx).await?;
        Ok(volumes.first().and_then(|v| {
            let links = v.volume_info.image_links.as_ref()?;
            let url = links.thumbnail.clone().or_else(|| links.small_thumbnail.clone())?;
            Some(CoverResult {
                url: url.replace("http://", "https://"),
                source: CoverSource::GoogleBooks,
                size: Some(CoverSize::Small),
            })
        }))
    }
}

