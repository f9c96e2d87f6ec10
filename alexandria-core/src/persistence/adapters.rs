//! Write-back adapters: apply the quality merge gate before persisting
//! enrichment results, and upsert work/author links idempotently.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::postgres::PgPool;
use sqlx::Row;

use alexandria_model::{Author, AuthorKey, Edition, Isbn, ProviderType, Work, WorkAuthorLink, WorkKey};

use crate::error::{CoreError, Result};
use crate::quality::{
    author_completeness, decide_merge, edition_completeness, provider_bonus, work_completeness, MergeDecision,
};

pub struct PostgresAdapters {
    pool: PgPool,
}

impl PostgresAdapters {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_existing_edition(&self, isbn: &Isbn) -> Result<Option<Edition>> {
        let row = sqlx::query(
            "SELECT isbn, title, subtitle, publisher, publication_date, page_count, language, \
             format, cover_small, cover_medium, cover_large, cover_original, cover_source, \
             work_key, primary_provider, completeness_score, related_isbns, created_at, updated_at \
             FROM editions WHERE isbn = $1",
        )
        .bind(isbn.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::Database)?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(row_to_edition(&row)?))
    }

    /// Applies the merge gate and writes `edition` if the decision isn't
    /// `Skip`. `provider_type`/`is_user_correction` feed the write-back
    /// provider bonus; `external_id_count` feeds completeness.
    pub async fn enrich_edition(
        &self,
        mut edition: Edition,
        provider_type: Option<ProviderType>,
        is_user_correction: bool,
        external_id_count: usize,
    ) -> Result<MergeDecision> {
        let existing = self.get_existing_edition(&edition.isbn).await?;
        let incoming_score = (edition_completeness(&edition, external_id_count)
            + provider_bonus(provider_type, is_user_correction))
        .min(100);

        let decision = decide_merge(
            existing.as_ref().map(|e| e.completeness_score),
            incoming_score,
            existing.as_ref().map(|e| fills_any_null_edition_field(e, &edition)).unwrap_or(true),
        );

        if decision == MergeDecision::Skip {
            return Ok(decision);
        }

        if decision == MergeDecision::FieldFillOnly {
            if let Some(existing) = existing {
                edition = merge_fill_edition(existing, edition);
            }
        }

        edition.completeness_score = incoming_score;
        edition.updated_at = Utc::now();
        self.upsert_edition(&edition).await?;
        Ok(decision)
    }

    async fn upsert_edition(&self, edition: &Edition) -> Result<()> {
        let related_isbns = serde_json::to_value(&edition.related_isbns).map_err(CoreError::Serialization)?;
        sqlx::query(
            "INSERT INTO editions (isbn, title, subtitle, publisher, publication_date, page_count, \
             language, format, cover_small, cover_medium, cover_large, cover_original, cover_source, \
             work_key, primary_provider, completeness_score, related_isbns, created_at, updated_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,$19) \
             ON CONFLICT (isbn) DO UPDATE SET \
             title = EXCLUDED.title, subtitle = EXCLUDED.subtitle, publisher = EXCLUDED.publisher, \
             publication_date = EXCLUDED.publication_date, page_count = EXCLUDED.page_count, \
             language = EXCLUDED.language, format = EXCLUDED.format, cover_small = EXCLUDED.cover_small, \
             cover_medium = EXCLUDED.cover_medium, cover_large = EXCLUDED.cover_large, \
             cover_original = EXCLUDED.cover_original, cover_source = EXCLUDED.cover_source, \
             primary_provider = EXCLUDED.primary_provider, completeness_score = EXCLUDED.completeness_score, \
             related_isbns = EXCLUDED.related_isbns, updated_at = EXCLUDED.updated_at",
        )
        .bind(edition.isbn.as_str())
        .bind(&edition.title)
        .bind(&edition.subtitle)
        .bind(&edition.publisher)
        .bind(&edition.publication_date)
        .bind(edition.page_count)
        .bind(&edition.language)
        .bind(&edition.format)
        .bind(&edition.cover_small)
        .bind(&edition.cover_medium)
        .bind(&edition.cover_large)
        .bind(&edition.cover_original)
        .bind(edition.cover_source.map(|s| s.to_string()))
        .bind(edition.work_key.as_str())
        .bind(&edition.primary_provider)
        .bind(edition.completeness_score)
        .bind(related_isbns)
        .bind(edition.created_at)
        .bind(edition.updated_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::Database)?;
        Ok(())
    }

    pub async fn get_existing_work(&self, work_key: &WorkKey) -> Result<Option<Work>> {
        let row = sqlx::query(
            "SELECT work_key, title, description, subject_tags, first_publication_year, \
             primary_provider, synthetic, completeness_score, cover_large, original_language, \
             created_at, updated_at FROM works WHERE work_key = $1",
        )
        .bind(work_key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::Database)?;

        let Some(row) = row else { return Ok(None) };
        Ok(Some(row_to_work(&row)?))
    }

    pub async fn find_or_create_work(&self, work_key: &WorkKey, title: &str) -> Result<Work> {
        if let Some(existing) = self.get_existing_work(work_key).await? {
            return Ok(existing);
        }

        let work = if work_key.is_synthetic() {
            Work::new_synthetic_ai(work_key.clone(), title.to_string())
        } else {
            Work::new(work_key.clone(), title.to_string())
        };
        self.upsert_work(&work).await?;
        Ok(work)
    }

    pub async fn enrich_work(
        &self,
        mut work: Work,
        provider_type: Option<ProviderType>,
        is_user_correction: bool,
        external_id_count: usize,
    ) -> Result<MergeDecision> {
        let existing = self.get_existing_work(&work.work_key).await?;
        let incoming_score =
            (work_completeness(&work, external_id_count) + provider_bonus(provider_type, is_user_correction)).min(100);

        let decision = decide_merge(
            existing.as_ref().map(|w| w.completeness_score),
            incoming_score,
            existing.as_ref().map(|w| fills_any_null_work_field(w, &work)).unwrap_or(true),
        );

        if decision == MergeDecision::Skip {
            return Ok(decision);
        }

        if decision == MergeDecision::FieldFillOnly {
            if let Some(existing) = existing {
                work = merge_fill_work(existing, work);
            }
        }

        work.completeness_score = incoming_score;
        work.updated_at = Utc::now();
        self.upsert_work(&work).await?;
        Ok(decision)
    }

    async fn upsert_work(&self, work: &Work) -> Result<()> {
        sqlx::query(
            "INSERT INTO works (work_key, title, description, subject_tags, first_publication_year, \
             primary_provider, synthetic, completeness_score, cover_large, original_language, \
             created_at, updated_at) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12) \
             ON CONFLICT (work_key) DO UPDATE SET \
             title = EXCLUDED.title, description = EXCLUDED.description, subject_tags = EXCLUDED.subject_tags, \
             first_publication_year = EXCLUDED.first_publication_year, primary_provider = EXCLUDED.primary_provider, \
             synthetic = EXCLUDED.synthetic, completeness_score = EXCLUDED.completeness_score, \
             cover_large = EXCLUDED.cover_large, original_language = EXCLUDED.original_language, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(work.work_key.as_str())
        .bind(&work.title)
        .bind(&work.description)
        .bind(&work.subject_tags)
        .bind(work.first_publication_year)
        .bind(&work.primary_provider)
        .bind(work.synthetic)
        .bind(work.completeness_score)
        .bind(&work.cover_large)
        .bind(&work.original_language)
        .bind(work.created_at)
        .bind(work.updated_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::Database)?;
        Ok(())
    }

    pub async fn find_or_create_author(&self, author_key: &AuthorKey, name: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO authors (author_key, name, normalized_name) VALUES ($1, $2, $3) \
             ON CONFLICT (author_key) DO NOTHING",
        )
        .bind(author_key.as_str())
        .bind(name)
        .bind(alexandria_model::normalize_author_name(name))
        .execute(&self.pool)
        .await
        .map_err(CoreError::Database)?;
        Ok(())
    }

    /// Idempotent: `(work_key, author_key)` is unique, so a repeat call is a
    /// no-op rather than a duplicate row.
    pub async fn link_work_to_author(&self, link: &WorkAuthorLink) -> Result<()> {
        sqlx::query(
            "INSERT INTO work_author_links (work_key, author_key, author_order) VALUES ($1, $2, $3) \
             ON CONFLICT (work_key, author_key) DO NOTHING",
        )
        .bind(link.work_key.as_str())
        .bind(link.author_key.as_str())
        .bind(link.author_order as i32)
        .execute(&self.pool)
        .await
        .map_err(CoreError::Database)?;
        Ok(())
    }

    /// Sets `bio`/`bio_source`/`wikidata_enriched_at`. Called by the Author
    /// queue consumer; callers only invoke this with a non-empty bio.
    pub async fn update_author_biography(&self, author_key: &AuthorKey, bio: &str, bio_source: &str) -> Result<()> {
        sqlx::query(
            "UPDATE authors SET bio = $2, bio_source = $3, wikidata_enriched_at = now(), updated_at = now() \
             WHERE author_key = $1",
        )
        .bind(author_key.as_str())
        .bind(bio)
        .bind(bio_source)
        .execute(&self.pool)
        .await
        .map_err(CoreError::Database)?;
        Ok(())
    }

    pub async fn get_existing_author(&self, author_key: &AuthorKey) -> Result<Option<Author>> {
        let row = sqlx::query(
            "SELECT author_key, name, normalized_name, gender, nationality, birth_date, death_date, \
             birth_place, occupations, movements, awards, external_ids, bio, bio_source, view_count, \
             last_viewed_at, heat_score, wikidata_enriched_at, created_at, updated_at \
             FROM authors WHERE author_key = $1",
        )
        .bind(author_key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::Database)?;

        row.map(|r| row_to_author(&r)).transpose()
    }

    /// Applies the merge gate to a caller-submitted author record (e.g. from
    /// `POST /api/enrich/author`). Unlike editions/works, authors have no
    /// stored `completeness_score` column; both sides of the merge decision
    /// are computed from the rows themselves.
    pub async fn enrich_author(
        &self,
        mut author: Author,
        provider_type: Option<ProviderType>,
        is_user_correction: bool,
        external_id_count: usize,
    ) -> Result<MergeDecision> {
        let existing = self.get_existing_author(&author.author_key).await?;
        let incoming_score =
            (author_completeness(&author, external_id_count) + provider_bonus(provider_type, is_user_correction)).min(100);

        let existing_score = existing.as_ref().map(|a| author_completeness(a, 0));
        let decision = decide_merge(
            existing_score,
            incoming_score,
            existing.as_ref().map(|a| fills_any_null_author_field(a, &author)).unwrap_or(true),
        );

        if decision == MergeDecision::Skip {
            return Ok(decision);
        }

        if decision == MergeDecision::FieldFillOnly {
            if let Some(existing) = existing {
                author = merge_fill_author(existing, author);
            }
        }

        author.updated_at = Utc::now();
        self.upsert_author(&author).await?;
        Ok(decision)
    }

    async fn upsert_author(&self, author: &Author) -> Result<()> {
        let external_ids = serde_json::to_value(&author.external_ids).map_err(CoreError::Serialization)?;
        sqlx::query(
            "INSERT INTO authors (author_key, name, normalized_name, gender, nationality, birth_date, \
             death_date, birth_place, occupations, movements, awards, external_ids, bio, bio_source, \
             created_at, updated_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16) \
             ON CONFLICT (author_key) DO UPDATE SET \
             name = EXCLUDED.name, normalized_name = EXCLUDED.normalized_name, gender = EXCLUDED.gender, \
             nationality = EXCLUDED.nationality, birth_date = EXCLUDED.birth_date, \
             death_date = EXCLUDED.death_date, birth_place = EXCLUDED.birth_place, \
             occupations = EXCLUDED.occupations, movements = EXCLUDED.movements, awards = EXCLUDED.awards, \
             external_ids = EXCLUDED.external_ids, bio = EXCLUDED.bio, bio_source = EXCLUDED.bio_source, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(author.author_key.as_str())
        .bind(&author.name)
        .bind(&author.normalized_name)
        .bind(&author.gender)
        .bind(&author.nationality)
        .bind(&author.birth_date)
        .bind(&author.death_date)
        .bind(&author.birth_place)
        .bind(&author.occupations)
        .bind(&author.movements)
        .bind(&author.awards)
        .bind(external_ids)
        .bind(&author.bio)
        .bind(&author.bio_source)
        .bind(author.created_at)
        .bind(author.updated_at)
        .execute(&self.pool)
        .await
        .map_err(CoreError::Database)?;
        Ok(())
    }

    /// Authors ordered by `heat_score` descending, for tiered harvest
    /// selection (top-10/top-100/top-1000/...).
    pub async fn list_authors_by_rank(&self, offset: i64, limit: i64) -> Result<Vec<Author>> {
        let rows = sqlx::query(
            "SELECT author_key, name, normalized_name, gender, nationality, birth_date, death_date, \
             birth_place, occupations, movements, awards, external_ids, bio, bio_source, view_count, \
             last_viewed_at, heat_score, wikidata_enriched_at, created_at, updated_at \
             FROM authors ORDER BY heat_score DESC, author_key ASC OFFSET $1 LIMIT $2",
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::Database)?;

        rows.iter().map(row_to_author).collect()
    }

    /// Authors matching a curated name list, by case-folded exact name.
    /// Missing names are silently skipped; the workflow reports how many of
    /// the requested names it actually found.
    pub async fn list_authors_by_names(&self, names: &[String]) -> Result<Vec<Author>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT author_key, name, normalized_name, gender, nationality, birth_date, death_date, \
             birth_place, occupations, movements, awards, external_ids, bio, bio_source, view_count, \
             last_viewed_at, heat_score, wikidata_enriched_at, created_at, updated_at \
             FROM authors WHERE normalized_name = ANY($1)",
        )
        .bind(
            names
                .iter()
                .map(|n| alexandria_model::normalize_author_name(n))
                .collect::<Vec<_>>(),
        )
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::Database)?;

        rows.iter().map(row_to_author).collect()
    }

    /// A named curated author list, set up out of band (there is no write
    /// path for these in this crate).
    pub async fn get_curated_author_list(&self, list_name: &str) -> Result<Option<Vec<String>>> {
        let row = sqlx::query("SELECT author_names FROM curated_author_lists WHERE list_name = $1")
            .bind(list_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::Database)?;

        row.map(|r| r.try_get::<Vec<String>, _>("author_names").map_err(CoreError::Database))
            .transpose()
    }
}

fn fills_any_null_edition_field(existing: &Edition, incoming: &Edition) -> bool {
    (existing.subtitle.is_none() && incoming.subtitle.is_some())
        || (existing.publisher.is_none() && incoming.publisher.is_some())
        || (existing.publication_date.is_none() && incoming.publication_date.is_some())
        || (existing.page_count.is_none() && incoming.page_count.is_some())
        || (existing.language.is_none() && incoming.language.is_some())
        || (existing.format.is_none() && incoming.format.is_some())
        || (!existing.has_cover() && incoming.has_cover())
}

fn merge_fill_edition(mut existing: Edition, incoming: Edition) -> Edition {
    existing.subtitle = existing.subtitle.or(incoming.subtitle);
    existing.publisher = existing.publisher.or(incoming.publisher);
    existing.publication_date = existing.publication_date.or(incoming.publication_date);
    existing.page_count = existing.page_count.or(incoming.page_count);
    existing.language = existing.language.or(incoming.language);
    existing.format = existing.format.or(incoming.format);
    if !existing.has_cover() {
        existing.cover_small = incoming.cover_small;
        existing.cover_medium = incoming.cover_medium;
        existing.cover_large = incoming.cover_large;
        existing.cover_original = incoming.cover_original;
        existing.cover_source = incoming.cover_source;
    }
    existing
}

fn fills_any_null_work_field(existing: &Work, incoming: &Work) -> bool {
    (existing.description.is_none() && incoming.description.is_some())
        || (existing.subject_tags.is_empty() && !incoming.subject_tags.is_empty())
        || (existing.cover_large.is_none() && incoming.cover_large.is_some())
        || (existing.original_language.is_none() && incoming.original_language.is_some())
        || (existing.first_publication_year.is_none() && incoming.first_publication_year.is_some())
}

fn merge_fill_work(mut existing: Work, incoming: Work) -> Work {
    existing.description = existing.description.or(incoming.description);
    if existing.subject_tags.is_empty() {
        existing.subject_tags = incoming.subject_tags;
    }
    existing.cover_large = existing.cover_large.or(incoming.cover_large);
    existing.original_language = existing.original_language.or(incoming.original_language);
    existing.first_publication_year = existing.first_publication_year.or(incoming.first_publication_year);
    existing
}

fn fills_any_null_author_field(existing: &Author, incoming: &Author) -> bool {
    (existing.bio.is_none() && incoming.bio.is_some())
        || (existing.nationality.is_none() && incoming.nationality.is_some())
        || (existing.birth_date.is_none() && incoming.birth_date.is_some())
        || (existing.death_date.is_none() && incoming.death_date.is_some())
        || (existing.birth_place.is_none() && incoming.birth_place.is_some())
        || (existing.occupations.is_empty() && !incoming.occupations.is_empty())
        || (existing.movements.is_empty() && !incoming.movements.is_empty())
        || (existing.awards.is_empty() && !incoming.awards.is_empty())
}

fn merge_fill_author(mut existing: Author, incoming: Author) -> Author {
    existing.bio = existing.bio.or(incoming.bio);
    existing.bio_source = existing.bio_source.or(incoming.bio_source);
    existing.nationality = existing.nationality.or(incoming.nationality);
    existing.birth_date = existing.birth_date.or(incoming.birth_date);
    existing.death_date = existing.death_date.or(incoming.death_date);
    existing.birth_place = existing.birth_place.or(incoming.birth_place);
    if existing.occupations.is_empty() {
        existing.occupations = incoming.occupations;
    }
    if existing.movements.is_empty() {
        existing.movements = incoming.movements;
    }
    if existing.awards.is_empty() {
        existing.awards = incoming.awards;
    }
    existing
}

fn row_to_edition(row: &sqlx::postgres::PgRow) -> Result<Edition> {
    let isbn: String = row.try_get("isbn").map_err(CoreError::Database)?;
    let work_key: String = row.try_get("work_key").map_err(CoreError::Database)?;
    let related_isbns_json: serde_json::Value = row.try_get("related_isbns").map_err(CoreError::Database)?;
    let related_isbns: HashMap<String, String> =
        serde_json::from_value(related_isbns_json).map_err(CoreError::Serialization)?;
    let cover_source: Option<String> = row.try_get("cover_source").map_err(CoreError::Database)?;

    Ok(Edition {
        isbn: Isbn::parse(&isbn).map_err(CoreError::Model)?,
        title: row.try_get("title").map_err(CoreError::Database)?,
        subtitle: row.try_get("subtitle").map_err(CoreError::Database)?,
        publisher: row.try_get("publisher").map_err(CoreError::Database)?,
        publication_date: row.try_get("publication_date").map_err(CoreError::Database)?,
        page_count: row.try_get("page_count").map_err(CoreError::Database)?,
        language: row.try_get("language").map_err(CoreError::Database)?,
        format: row.try_get("format").map_err(CoreError::Database)?,
        cover_small: row.try_get("cover_small").map_err(CoreError::Database)?,
        cover_medium: row.try_get("cover_medium").map_err(CoreError::Database)?,
        cover_large: row.try_get("cover_large").map_err(CoreError::Database)?,
        cover_original: row.try_get("cover_original").map_err(CoreError::Database)?,
        cover_source: cover_source.and_then(|s| parse_cover_source(&s)),
        work_key: WorkKey::parse(&work_key).map_err(CoreError::Model)?,
        primary_provider: row.try_get("primary_provider").map_err(CoreError::Database)?,
        completeness_score: row.try_get("completeness_score").map_err(CoreError::Database)?,
        related_isbns,
        created_at: row.try_get("created_at").map_err(CoreError::Database)?,
        updated_at: row.try_get("updated_at").map_err(CoreError::Database)?,
    })
}

fn row_to_work(row: &sqlx::postgres::PgRow) -> Result<Work> {
    let work_key: String = row.try_get("work_key").map_err(CoreError::Database)?;
    Ok(Work {
        work_key: WorkKey::parse(&work_key).map_err(CoreError::Model)?,
        title: row.try_get("title").map_err(CoreError::Database)?,
        description: row.try_get("description").map_err(CoreError::Database)?,
        subject_tags: row.try_get("subject_tags").map_err(CoreError::Database)?,
        first_publication_year: row.try_get("first_publication_year").map_err(CoreError::Database)?,
        primary_provider: row.try_get("primary_provider").map_err(CoreError::Database)?,
        synthetic: row.try_get("synthetic").map_err(CoreError::Database)?,
        completeness_score: row.try_get("completeness_score").map_err(CoreError::Database)?,
        cover_large: row.try_get("cover_large").map_err(CoreError::Database)?,
        original_language: row.try_get("original_language").map_err(CoreError::Database)?,
        created_at: row.try_get("created_at").map_err(CoreError::Database)?,
        updated_at: row.try_get("updated_at").map_err(CoreError::Database)?,
    })
}

fn row_to_author(row: &sqlx::postgres::PgRow) -> Result<Author> {
    let author_key: String = row.try_get("author_key").map_err(CoreError::Database)?;
    let external_ids_json: serde_json::Value = row.try_get("external_ids").map_err(CoreError::Database)?;
    let external_ids: HashMap<String, String> =
        serde_json::from_value(external_ids_json).map_err(CoreError::Serialization)?;

    Ok(Author {
        author_key: AuthorKey::parse(&author_key).map_err(CoreError::Model)?,
        name: row.try_get("name").map_err(CoreError::Database)?,
        normalized_name: row.try_get("normalized_name").map_err(CoreError::Database)?,
        gender: row.try_get("gender").map_err(CoreError::Database)?,
        nationality: row.try_get("nationality").map_err(CoreError::Database)?,
        birth_date: row.try_get("birth_date").map_err(CoreError::Database)?,
        death_date: row.try_get("death_date").map_err(CoreError::Database)?,
        birth_place: row.try_get("birth_place").map_err(CoreError::Database)?,
        occupations: row.try_get("occupations").map_err(CoreError::Database)?,
        movements: row.try_get("movements").map_err(CoreError::Database)?,
        awards: row.try_get("awards").map_err(CoreError::Database)?,
        external_ids,
        bio: row.try_get("bio").map_err(CoreError::Database)?,
        bio_source: row.try_get("bio_source").map_err(CoreError::Database)?,
        view_count: row.try_get("view_count").map_err(CoreError::Database)?,
        last_viewed_at: row.try_get("last_viewed_at").map_err(CoreError::Database)?,
        heat_score: row.try_get("heat_score").map_err(CoreError::Database)?,
        wikidata_enriched_at: row.try_get("wikidata_enriched_at").map_err(CoreError::Database)?,
        created_at: row.try_get("created_at").map_err(CoreError::Database)?,
        updated_at: row.try_get("updated_at").map_err(CoreError::Database)?,
    })
}

fn parse_cover_source(s: &str) -> Option<alexandria_model::CoverSource> {
    use alexandria_model::CoverSource::*;
    match s {
        "isbndb" => Some(Isbndb),
        "openlibrary" => Some(Openlibrary),
        "google_books" => Some(GoogleBooks),
        "r2" => Some(R2),
        "alexandria" => Some(Alexandria),
        _ => None,
    }
}
