use serde::{Deserialize, Serialize};
use std::fmt;

/// A declared operation class a provider can implement, from the closed set
/// the enrichment core supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    IsbnResolution,
    MetadataEnrichment,
    CoverImages,
    AuthorBiography,
    AuthorBibliography,
    SubjectEnrichment,
    BookGeneration,
    Ratings,
    EditionVariants,
    PublicDomain,
    SubjectBrowsing,
    SeriesInfo,
    Awards,
    Translations,
    EnhancedExternalIds,
}

impl Capability {
    pub fn all() -> &'static [Capability] {
        use Capability::*;
        &[
            IsbnResolution,
            MetadataEnrichment,
            CoverImages,
            AuthorBiography,
            AuthorBibliography,
            SubjectEnrichment,
            BookGeneration,
            Ratings,
            EditionVariants,
            PublicDomain,
            SubjectBrowsing,
            SeriesInfo,
            Awards,
            Translations,
            EnhancedExternalIds,
        ]
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::IsbnResolution => "isbn_resolution",
            Capability::MetadataEnrichment => "metadata_enrichment",
            Capability::CoverImages => "cover_images",
            Capability::AuthorBiography => "author_biography",
            Capability::AuthorBibliography => "author_bibliography",
            Capability::SubjectEnrichment => "subject_enrichment",
            Capability::BookGeneration => "book_generation",
            Capability::Ratings => "ratings",
            Capability::EditionVariants => "edition_variants",
            Capability::PublicDomain => "public_domain",
            Capability::SubjectBrowsing => "subject_browsing",
            Capability::SeriesInfo => "series_info",
            Capability::Awards => "awards",
            Capability::Translations => "translations",
            Capability::EnhancedExternalIds => "enhanced_external_ids",
        };
        write!(f, "{s}")
    }
}

/// Provider trust tier, driving both ordering (free-first, paid-last) and
/// the write-back provider bonus applied during quality scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
    Free,
    Paid,
    Ai,
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderType::Free => "free",
            ProviderType::Paid => "paid",
            ProviderType::Ai => "ai",
        };
        write!(f, "{s}")
    }
}

/// Cover-source provenance recorded on an Edition. `R2`/`Alexandria` imply
/// the cover bytes live in object storage rather than at an external URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverSource {
    Isbndb,
    Openlibrary,
    GoogleBooks,
    R2,
    Alexandria,
}

impl CoverSource {
    /// True when the cover source implies object storage rather than a
    /// passthrough to an external URL.
    pub fn is_object_stored(&self) -> bool {
        matches!(self, CoverSource::R2 | CoverSource::Alexandria)
    }
}

impl fmt::Display for CoverSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CoverSource::Isbndb => "isbndb",
            CoverSource::Openlibrary => "openlibrary",
            CoverSource::GoogleBooks => "google_books",
            CoverSource::R2 => "r2",
            CoverSource::Alexandria => "alexandria",
        };
        write!(f, "{s}")
    }
}

/// Cover size tiers tracked on an Edition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverSize {
    Small,
    Medium,
    Large,
    Original,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_source_object_storage_flag() {
        assert!(CoverSource::R2.is_object_stored());
        assert!(CoverSource::Alexandria.is_object_stored());
        assert!(!CoverSource::Openlibrary.is_object_stored());
    }
}
