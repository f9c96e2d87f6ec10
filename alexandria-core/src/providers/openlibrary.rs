//! Open Library: free, no API key, generous rate limit. Covers metadata,
//! covers, and a publication-date heuristic for public-domain screening —
//! the only provider that offers the latter without a paid license lookup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, TimeZone, Utc};
use serde::Deserialize;

use alexandria_contracts::error::Result;
use alexandria_contracts::providers::{
    BookMetadata, CoverProvider, CoverResult, MetadataProvider, Provider, PublicDomainProvider,
    PublicDomainReason, PublicDomainResult, ServiceContext,
};
use alexandria_model::{Capability, CoverSize, CoverSource, Isbn, ProviderType};

use crate::http_client::{FetchOptions, HttpClient};

const BASE_URL: &str = "https://openlibrary.org";
const COVERS_BASE_URL: &str = "https://covers.openlibrary.org/b/isbn";

/// Life + 70 years, the most common public-domain threshold; used only as a
/// coarse heuristic, never authoritative (`PublicDomainReason::PublicationDate`
/// ranks below an explicit-license or api-verified result).
const PUBLIC_DOMAIN_CUTOFF_YEARS: i32 = 95;

#[derive(Debug, Deserialize, Default)]
struct OpenLibraryEdition {
    title: Option<String>,
    subtitle: Option<String>,
    publishers: Option<Vec<String>>,
    publish_date: Option<String>,
    number_of_pages: Option<i32>,
    languages: Option<Vec<serde_json::Value>>,
    physical_format: Option<String>,
    subjects: Option<Vec<String>>,
    #[serde(default)]
    isbn_13: Vec<String>,
}

pub struct OpenlibraryProvider {
    http: Arc<tokio::sync::Mutex<HttpClient>>,
}

impl OpenlibraryProvider {
    pub fn new(http: Arc<tokio::sync::Mutex<HttpClient>>) -> Self {
        Self { http }
    }

    async fn fetch_edition(&self, isbn: &Isbn, ctx: &ServiceContext) -> Result<Option<OpenLibraryEdition>> {
        let url = format!("{BASE_URL}/isbn/{}.json", isbn.as_str());
        let mut client = self.http.lock().await;
        let mut opts = FetchOptions::get("openlibrary", "metadata");
        opts.rate_limit_ms = 50;
        Ok(client.fetch::<OpenLibraryEdition>(&url, opts, ctx).await?)
    }
}

#[async_trait]
impl Provider for OpenlibraryProvider {
    fn name(&self) -> &str {
        "openlibrary"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Free
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::MetadataEnrichment, Capability::CoverImages, Capability::PublicDomain]
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[async_trait]
impl MetadataProvider for OpenlibraryProvider {
    async fn fetch_metadata(&self, isbn: &Isbn, ctx: &ServiceContext) -> Result<Option<BookMetadata>> {
        let edition = self.fetch_edition(isbn, ctx).await?;
        Ok(edition.map(|e| BookMetadata {
            title: e.title.unwrap_or_default(),
            subtitle: e.subtitle,
            publisher: e.publishers.and_then(|p| p.into_iter().next()),
            publication_date: e.publish_date,
            page_count: e.number_of_pages,
            language: None,
            format: e.physical_format,
            description: None,
            subject_tags: e.subjects.unwrap_or_default(),
            external_ids: HashMap::new(),
        }))
    }
}

#[async_trait]
impl CoverProvider for OpenlibraryProvider {
    async fn fetch_cover(&self, isbn: &Isbn, _ctx: &ServiceContext) -> Result<Option<CoverResult>> {
        Ok(Some(CoverResult {
            url: format!("{COVERS_BASE_URL}/{}-L.jpg", isbn.as_str()),
            source: CoverSource::Openlibrary,
            size: Some(CoverSize::Large),
        }))
    }
}

#[async_trait]
impl PublicDomainProvider for OpenlibraryProvider {
    async fn check_public_domain(&self, isbn: &Isbn, ctx: &ServiceContext) -> Result<Option<PublicDomainResult>> {
        let edition = self.fetch_edition(isbn, ctx).await?;
        let Some(edition) = edition else { return Ok(None) };

        let publish_year = edition
            .publish_date
            .as_deref()
            .and_then(extract_year);

        let Some(year) = publish_year else { return Ok(None) };

        let current_year = Utc::now().year();
        let is_public_domain = current_year - year >= PUBLIC_DOMAIN_CUTOFF_YEARS;

        Ok(Some(PublicDomainResult {
            is_public_domain,
            confidence: if is_public_domain { 55 } else { 80 },
            reason: PublicDomainReason::PublicationDate,
            copyright_expiry: Utc.with_ymd_and_hms(year + PUBLIC_DOMAIN_CUTOFF_YEARS, 1, 1, 0, 0, 0).single(),
            download_url: None,
        }))
    }
}

fn extract_year(date: &str) -> Option<i32> {
    date.chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .get(0..4)
        .and_then(|s| s.parse().ok())
        .or_else(|| date.split_whitespace().last().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_year_handles_plain_and_prefixed_dates() {
        assert_eq!(extract_year("1923"), Some(1923));
        assert_eq!(extract_year("March 1923"), Some(1923));
    }
}
