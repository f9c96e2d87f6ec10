//! Concrete capability providers: ISBNdb (paid), Open Library, Google Books
//! and Wikidata (free), Gemini (AI). `ProviderSet` wires each up from
//! process configuration and exposes capability-keyed lists in the order
//! the orchestrators should consult them by default.

pub mod gemini;
pub mod google_books;
pub mod isbndb;
pub mod openlibrary;
pub mod wikidata;

pub use gemini::GeminiProvider;
pub use google_books::GoogleBooksProvider;
pub use isbndb::IsbndbProvider;
pub use openlibrary::OpenlibraryProvider;
pub use wikidata::WikidataProvider;

use std::sync::Arc;

use alexandria_config::ProviderConfig;
use alexandria_contracts::providers::{
    AuthorBibliographyProvider, AuthorBiographyProvider, BookGenerator, CoverProvider, IsbnResolver,
    MetadataProvider, Provider, PublicDomainProvider,
};
use alexandria_contracts::quota::QuotaManager;

use crate::http_client::HttpClient;

pub struct ProviderSet {
    pub isbndb: Arc<IsbndbProvider>,
    pub openlibrary: Arc<OpenlibraryProvider>,
    pub google_books: Arc<GoogleBooksProvider>,
    pub wikidata: Arc<WikidataProvider>,
    pub gemini: Arc<GeminiProvider>,
}

impl ProviderSet {
    pub fn new(
        config: &ProviderConfig,
        http: Arc<tokio::sync::Mutex<HttpClient>>,
        isbndb_quota: Arc<dyn QuotaManager>,
    ) -> Self {
        Self {
            isbndb: Arc::new(IsbndbProvider::new(
                config.isbndb_api_key.clone().unwrap_or_default(),
                http.clone(),
                isbndb_quota,
            )),
            openlibrary: Arc::new(OpenlibraryProvider::new(http.clone())),
            google_books: Arc::new(GoogleBooksProvider::new(config.google_books_api_key.clone(), http.clone())),
            wikidata: Arc::new(WikidataProvider::new(http.clone())),
            gemini: Arc::new(GeminiProvider::new(config.gemini_api_key.clone().unwrap_or_default(), http)),
        }
    }

    /// Paid-first: isbndb's catalog resolves exact-ISBN lookups more often
    /// than the free mirrors, and this capability alone spends quota to buy
    /// that accuracy up front.
    pub fn isbn_resolvers(&self) -> Vec<(&'static str, Arc<dyn IsbnResolver>)> {
        vec![
            ("isbndb", self.isbndb.clone() as Arc<dyn IsbnResolver>),
            ("google_books", self.google_books.clone() as Arc<dyn IsbnResolver>),
        ]
    }

    pub fn metadata_providers(&self) -> Vec<(&'static str, Arc<dyn MetadataProvider>)> {
        vec![
            ("openlibrary", self.openlibrary.clone() as Arc<dyn MetadataProvider>),
            ("google_books", self.google_books.clone() as Arc<dyn MetadataProvider>),
            ("isbndb", self.isbndb.clone() as Arc<dyn MetadataProvider>),
        ]
    }

    pub fn cover_providers(&self) -> Vec<(&'static str, Arc<dyn CoverProvider>)> {
        vec![
            ("openlibrary", self.openlibrary.clone() as Arc<dyn CoverProvider>),
            ("google_books", self.google_books.clone() as Arc<dyn CoverProvider>),
            ("isbndb", self.isbndb.clone() as Arc<dyn CoverProvider>),
        ]
    }

    pub fn public_domain_providers(&self) -> Vec<(&'static str, Arc<dyn PublicDomainProvider>)> {
        vec![("openlibrary", self.openlibrary.clone() as Arc<dyn PublicDomainProvider>)]
    }

    pub fn book_generators(&self) -> Vec<(&'static str, Arc<dyn BookGenerator>)> {
        vec![("gemini", self.gemini.clone() as Arc<dyn BookGenerator>)]
    }

    /// Wikidata first: it returns prose biography text. ISBNdb's endpoint
    /// never does (see its `fetch_author_biography` doc comment) but stays
    /// in the chain in case a future catalog revision adds one.
    pub fn author_biography_providers(&self) -> Vec<(&'static str, Arc<dyn AuthorBiographyProvider>)> {
        vec![
            ("wikidata", self.wikidata.clone() as Arc<dyn AuthorBiographyProvider>),
            ("isbndb", self.isbndb.clone() as Arc<dyn AuthorBiographyProvider>),
        ]
    }

    /// The only provider with an author-bibliography listing endpoint.
    pub fn author_bibliography_providers(&self) -> Vec<(&'static str, Arc<dyn AuthorBibliographyProvider>)> {
        vec![("isbndb", self.isbndb.clone() as Arc<dyn AuthorBibliographyProvider>)]
    }

    /// All providers as the base trait, for registry registration and
    /// availability-status endpoints.
    pub fn all(&self) -> Vec<Arc<dyn Provider>> {
        vec![
            self.isbndb.clone() as Arc<dyn Provider>,
            self.openlibrary.clone() as Arc<dyn Provider>,
            self.google_books.clone() as Arc<dyn Provider>,
            self.wikidata.clone() as Arc<dyn Provider>,
            self.gemini.clone() as Arc<dyn Provider>,
        ]
    }
}

/// Minimal percent-encoding for path segments and query values built from
/// titles/author names. Not a general-purpose URL encoder: it only needs to
/// survive round-tripping through the handful of provider APIs this crate
/// calls, all of which accept the common unreserved set plus `%XX`.
pub(crate) fn urlencode(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_string() } else { format!("%{:02X}", c as u32) })
        .collect()
}
