//! Wikidata/Wikipedia: free author-biography source. ISBNdb's author
//! endpoint has no prose bio field, so this is the only `AuthorBiography`
//! provider that returns actual text; the Author queue's orchestrator picks
//! it by default.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use alexandria_contracts::error::Result;
use alexandria_contracts::providers::{AuthorBiographyProvider, Provider, ServiceContext};
use alexandria_model::{Capability, ProviderType};

use crate::http_client::{FetchOptions, HttpClient};
use crate::providers::urlencode;

const WIKIDATA_ENTITY_URL: &str = "https://www.wikidata.org/wiki/Special:EntityData";
const WIKIPEDIA_SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";

#[derive(Debug, Deserialize)]
struct WikidataEntityResponse {
    entities: HashMap<String, WikidataEntity>,
}

#[derive(Debug, Deserialize, Default)]
struct WikidataEntity {
    #[serde(default)]
    sitelinks: HashMap<String, WikidataSitelink>,
}

#[derive(Debug, Deserialize)]
struct WikidataSitelink {
    title: String,
}

#[derive(Debug, Deserialize, Default)]
struct WikipediaSummary {
    extract: Option<String>,
}

pub struct WikidataProvider {
    http: Arc<tokio::sync::Mutex<HttpClient>>,
}

impl WikidataProvider {
    pub fn new(http: Arc<tokio::sync::Mutex<HttpClient>>) -> Self {
        Self { http }
    }

    /// Resolves the English Wikipedia page title for a Wikidata QID via its
    /// `enwiki` sitelink.
    async fn enwiki_title_for_qid(&self, qid: &str, ctx: &ServiceContext) -> Result<Option<String>> {
        let url = format!("{WIKIDATA_ENTITY_URL}/{qid}.json");
        let mut client = self.http.lock().await;
        let mut opts = FetchOptions::get("wikidata", "entity-lookup");
        opts.rate_limit_ms = 200;
        let response: Option<WikidataEntityResponse> = client.fetch(&url, opts, ctx).await?;

        Ok(response.and_then(|r| r.entities.get(qid).and_then(|e| e.sitelinks.get("enwiki")).map(|s| s.title.clone())))
    }

    async fn summary_for_title(&self, title: &str, ctx: &ServiceContext) -> Result<Option<String>> {
        let url = format!("{WIKIPEDIA_SUMMARY_URL}/{}", urlencode(title));
        let mut client = self.http.lock().await;
        let mut opts = FetchOptions::get("wikipedia", "summary");
        opts.rate_limit_ms = 200;
        let response: Option<WikipediaSummary> = client.fetch(&url, opts, ctx).await?;
        Ok(response.and_then(|r| r.extract))
    }
}

#[async_trait]
impl Provider for WikidataProvider {
    fn name(&self) -> &str {
        "wikidata"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Free
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::AuthorBiography]
    }

    async fn is_available(&self) -> bool {
        true
    }
}

#[async_trait]
impl AuthorBiographyProvider for WikidataProvider {
    async fn fetch_author_biography(
        &self,
        author_name: &str,
        wikidata_qid: Option<&str>,
        ctx: &ServiceContext,
    ) -> Result<Option<String>> {
        let title = match wikidata_qid {
            Some(qid) => match self.enwiki_title_for_qid(qid, ctx).await? {
                Some(title) => title,
                None => author_name.to_string(),
            },
            None => author_name.to_string(),
        };

        self.summary_for_title(&title, ctx).await
    }
}
