//! ISBNdb: paid provider, the richest catalog for exact ISBN lookups and the
//! only one wired for author-bibliography harvesting. Every call is quota
//! gated before it reaches the HTTP client.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use alexandria_contracts::error::{AlexandriaError, Result};
use alexandria_contracts::providers::{
    AuthorBibliographyProvider, AuthorBiographyProvider, BibliographyBook, BookMetadata,
    CoverProvider, CoverResult, IsbnResolution, IsbnResolver, MetadataProvider, Provider,
    ServiceContext,
};
use alexandria_contracts::quota::QuotaManager;
use alexandria_model::{Capability, CoverSize, CoverSource, Isbn, ProviderType};

use crate::dedup::{similarity_ratio, ISBN_VALIDATION_THRESHOLD};
use crate::http_client::{FetchOptions, HttpClient};
use crate::providers::urlencode;

const BASE_URL: &str = "https://api.isbndb.com";

#[derive(Debug, Deserialize)]
struct IsbndbBookEnvelope {
    book: IsbndbBook,
}

#[derive(Debug, Deserialize)]
struct IsbndbSearchEnvelope {
    books: Vec<IsbndbBook>,
}

#[derive(Debug, Deserialize, Default)]
struct IsbndbBook {
    isbn13: Option<String>,
    isbn: Option<String>,
    title: Option<String>,
    authors: Option<Vec<String>>,
    publisher: Option<String>,
    date_published: Option<String>,
    pages: Option<i32>,
    language: Option<String>,
    binding: Option<String>,
    synopsis: Option<String>,
    subjects: Option<Vec<String>>,
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IsbndbAuthorEnvelope {
    author: IsbndbAuthorDetails,
    #[serde(default)]
    books: Vec<IsbndbBook>,
}

#[derive(Debug, Deserialize, Default)]
struct IsbndbAuthorDetails {
    name: Option<String>,
}

pub struct IsbndbProvider {
    api_key: String,
    http: Arc<tokio::sync::Mutex<HttpClient>>,
    quota: Arc<dyn QuotaManager>,
}

impl IsbndbProvider {
    pub fn new(api_key: String, http: Arc<tokio::sync::Mutex<HttpClient>>, quota: Arc<dyn QuotaManager>) -> Self {
        Self { api_key, http, quota }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str, purpose: &str, ctx: &ServiceContext) -> Result<Option<T>> {
        if !self.quota.can_make_calls(1).await? {
            return Ok(None);
        }

        let url = format!("{BASE_URL}{path}");
        let mut client = self.http.lock().await;
        let mut opts = FetchOptions::get("isbndb", purpose).with_header("Authorization", self.api_key.clone());
        opts.rate_limit_ms = 120;

        let result = client
            .fetch::<T>(&url, opts, ctx)
            .await
            .map_err(AlexandriaError::from)?;

        if result.is_some() {
            self.quota.record_api_call(1).await?;
        }

        Ok(result)
    }
}

fn book_to_metadata(book: &IsbndbBook) -> BookMetadata {
    let mut external_ids = HashMap::new();
    if let Some(isbn13) = &book.isbn13 {
        external_ids.insert("isbn13".to_string(), isbn13.clone());
    }

    BookMetadata {
        title: book.title.clone().unwrap_or_default(),
        subtitle: None,
        publisher: book.publisher.clone(),
        publication_date: book.date_published.clone(),
        page_count: book.pages,
        language: book.language.clone(),
        format: book.binding.clone(),
        description: book.synopsis.clone(),
        subject_tags: book.subjects.clone().unwrap_or_default(),
        external_ids,
    }
}

#[async_trait]
impl Provider for IsbndbProvider {
    fn name(&self) -> &str {
        "isbndb"
    }

    fn provider_type(&self) -> ProviderType {
        ProviderType::Paid
    }

    fn capabilities(&self) -> &[Capability] {
        &[
            Capability::IsbnResolution,
            Capability::MetadataEnrichment,
            Capability::CoverImages,
            Capability::AuthorBiography,
            Capability::AuthorBibliography,
        ]
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty() && self.quota.can_make_calls(1).await.unwrap_or(false)
    }
}

#[async_trait]
impl IsbnResolver for IsbndbProvider {
    async fn resolve_isbn(&self, title: &str, author: &str, ctx: &ServiceContext) -> Result<IsbnResolution> {
        let query = format!("/books/{}", urlencode(title));
        let envelope: Option<IsbndbSearchEnvelope> = self.get(&query, "isbn-resolution", ctx).await?;

        let candidate = envelope.and_then(|env| {
            env.books.into_iter().find(|book| {
                let candidate_title = book.title.clone().unwrap_or_default();
                let candidate_author = book.authors.clone().unwrap_or_default().join(", ");
                similarity_ratio(&candidate_title, title) >= ISBN_VALIDATION_THRESHOLD
                    && similarity_ratio(&candidate_author, author) >= ISBN_VALIDATION_THRESHOLD
            })
        });

        match candidate {
            Some(book) => {
                let isbn = book
                    .isbn13
                    .as_deref()
                    .or(book.isbn.as_deref())
                    .and_then(|s| Isbn::parse(s).ok());
                Ok(IsbnResolution {
                    isbn,
                    confidence: 90,
                    source: "isbndb".to_string(),
                    metadata: None,
                })
            }
            None => Ok(IsbnResolution {
                isbn: None,
                confidence: 0,
                source: "isbndb".to_string(),
                metadata: None,
            }),
        }
    }
}

#[async_trait]
impl MetadataProvider for IsbndbProvider {
    async fn fetch_metadata(&self, isbn: &Isbn, ctx: &ServiceContext) -> Result<Option<BookMetadata>> {
        let path = format!("/book/{}", isbn.as_str());
        let envelope: Option<IsbndbBookEnvelope> = self.get(&path, "metadata", ctx).await?;
        Ok(envelope.map(|env| book_to_metadata(&env.book)))
    }

    /// ISBNdb's `/books` endpoint accepts a comma-separated ISBN list in one
    /// call, which is why the batch-direct API path costs exactly one unit
    /// of quota no matter how many ISBNs it covers.
    async fn batch_fetch_metadata(&self, isbns: &[Isbn], ctx: &ServiceContext) -> Result<HashMap<Isbn, BookMetadata>> {
        if isbns.is_empty() {
            return Ok(HashMap::new());
        }
        let joined = isbns.iter().map(Isbn::as_str).collect::<Vec<_>>().join(",");
        let path = format!("/books?isbns={}", urlencode(&joined));
        let envelope: Option<IsbndbSearchEnvelope> = self.get(&path, "batch-metadata", ctx).await?;

        let mut out = HashMap::with_capacity(isbns.len());
        if let Some(envelope) = envelope {
            for book in &envelope.books {
                let Some(isbn) = book.isbn13.as_deref().or(book.isbn.as_deref()).and_then(|s| Isbn::parse(s).ok()) else {
                    continue;
                };
                out.insert(isbn, book_to_metadata(book));
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl CoverProvider for IsbndbProvider {
    async fn fetch_cover(&self, isbn: &Isbn, ctx: &ServiceContext) -> Result<Option<CoverResult>> {
        let path = format!("/book/{}", isbn.as_str());
        let envelope: Option<IsbndbBookEnvelope> = self.get(&path, "cover", ctx).await?;
        Ok(envelope.and_then(|env| {
            env.book.image.map(|url| CoverResult {
                url,
                source: CoverSource::Isbndb,
                size: Some(CoverSize::Medium),
            })
        }))
    }
}

#[async_trait]
impl AuthorBiographyProvider for IsbndbProvider {
    async fn fetch_author_biography(
        &self,
        author_name: &str,
        _wikidata_qid: Option<&str>,
        ctx: &ServiceContext,
    ) -> Result<Option<String>> {
        // ISBNdb's author endpoint carries a bibliography, not prose biography
        // text; this only confirms the author is in its catalog.
        let path = format!("/author/{}", urlencode(author_name));
        let _envelope: Option<IsbndbAuthorEnvelope> = self.get(&path, "author-biography", ctx).await?;
        Ok(None)
    }
}

#[async_trait]
impl AuthorBibliographyProvider for IsbndbProvider {
    async fn fetch_author_bibliography(
        &self,
        author_name: &str,
        page: u32,
        ctx: &ServiceContext,
    ) -> Result<Vec<BibliographyBook>> {
        let path = format!("/author/{}?page={}", urlencode(author_name), page.max(1));
        let envelope: Option<IsbndbAuthorEnvelope> = self.get(&path, "author-bibliography", ctx).await?;
        Ok(envelope
            .map(|env| {
                env.books
                    .iter()
                    .map(|book| BibliographyBook {
                        isbn: book
                            .isbn13
                            .as_deref()
                            .or(book.isbn.as_deref())
                            .and_then(|s| Isbn::parse(s).ok()),
                        title: book.title.clone().unwrap_or_default(),
                        cover_url: book.image.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

