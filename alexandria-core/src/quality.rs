//! Completeness scoring and the write-back merge gate: refuses to overwrite
//! higher-confidence data with lower-confidence data.

use alexandria_model::{Author, Edition, ProviderType, Work};

/// Provider-trust bonus added to completeness, capped at 100 overall.
pub fn provider_bonus(provider_type: Option<ProviderType>, is_user_correction: bool) -> i32 {
    if is_user_correction {
        return 50;
    }
    match provider_type {
        Some(ProviderType::Paid) => 40,
        Some(ProviderType::Free) => 30,
        Some(ProviderType::Ai) => 20,
        None => 0,
    }
}

/// Edition completeness: weighted sum of populated fields (sum of weights
/// ≤ 60) plus a +5 bonus per distinct external-ID mapping, capped at 100.
pub fn edition_completeness(edition: &Edition, external_id_count: usize) -> i32 {
    let mut score = 0;
    score += weighted(!edition.title.is_empty(), 10);
    score += weighted(edition.cover_large.is_some(), 10);
    score += weighted(edition.publisher.is_some(), 5);
    score += weighted(edition.publication_date.is_some(), 5);
    score += weighted(edition.page_count.is_some(), 5);
    score += weighted(edition.language.is_some(), 5);
    score += weighted(edition.format.is_some(), 5);
    score += weighted(edition.cover_medium.is_some(), 3);
    score += weighted(edition.cover_small.is_some(), 2);
    score += (external_id_count as i32) * 5;
    score.min(100)
}

/// Work completeness: weighted sum (sum of weights ≤ 60) plus external-ID
/// bonus, capped at 100. The long/short description buckets are mutually
/// exclusive; a long description (> 200 chars) wins over a short one
/// (> 50 chars).
pub fn work_completeness(work: &Work, external_id_count: usize) -> i32 {
    let mut score = 0;
    score += weighted(!work.title.is_empty(), 10);

    let description_len = work.description.as_deref().map(str::len).unwrap_or(0);
    if description_len > 200 {
        score += 15;
    } else if description_len > 50 {
        score += 15;
    }

    score += weighted(work.cover_large.is_some(), 10);
    score += weighted(!work.subject_tags.is_empty(), 10);
    score += weighted(work.original_language.is_some(), 5);
    score += weighted(work.first_publication_year.is_some(), 5);
    score += (external_id_count as i32) * 5;
    score.min(100)
}

/// Author completeness: no weight table is spelled out the way editions and
/// works have one, so this mirrors their shape (weighted sum plus
/// external-ID bonus, capped at 100) rather than inventing an unrelated
/// scheme.
pub fn author_completeness(author: &Author, external_id_count: usize) -> i32 {
    let mut score = 0;
    score += weighted(author.bio.is_some(), 20);
    score += weighted(author.nationality.is_some(), 10);
    score += weighted(author.birth_date.is_some(), 10);
    score += weighted(author.death_date.is_some(), 5);
    score += weighted(author.birth_place.is_some(), 5);
    score += weighted(!author.occupations.is_empty(), 5);
    score += weighted(!author.movements.is_empty(), 5);
    score += weighted(!author.awards.is_empty(), 5);
    score += (external_id_count as i32) * 5;
    score.min(100)
}

fn weighted(populated: bool, weight: i32) -> i32 {
    if populated {
        weight
    } else {
        0
    }
}

/// Whether an incoming entity should overwrite an existing row's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// No existing row: write every field.
    WriteNew,
    /// Incoming score beats the existing one by more than the improvement
    /// margin: write every field.
    WriteImproved,
    /// Incoming score does not justify a full overwrite, but fills at least
    /// one null/empty field on the existing row: write only those fields.
    FieldFillOnly,
    /// Neither condition holds: skip.
    Skip,
}

/// Minimum score improvement required to justify a full overwrite.
pub const SIGNIFICANT_IMPROVEMENT_MARGIN: i32 = 10;

/// Applies the merge policy: existence, then significant-improvement, then
/// field-fill, then skip.
pub fn decide_merge(
    existing_score: Option<i32>,
    incoming_score: i32,
    incoming_fills_any_null_field: bool,
) -> MergeDecision {
    match existing_score {
        None => MergeDecision::WriteNew,
        Some(existing) if incoming_score > existing + SIGNIFICANT_IMPROVEMENT_MARGIN => {
            MergeDecision::WriteImproved
        }
        Some(_) if incoming_fills_any_null_field => MergeDecision::FieldFillOnly,
        Some(_) => MergeDecision::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alexandria_model::{Isbn, WorkKey};

    fn sample_edition() -> Edition {
        Edition::new(
            Isbn::parse("9780439064873").unwrap(),
            "Harry Potter and the Chamber of Secrets".to_string(),
            WorkKey::parse("/works/OL1W").unwrap(),
        )
    }

    #[test]
    fn edition_completeness_caps_at_100() {
        let mut edition = sample_edition();
        edition.cover_large = Some("https://example.com/large.jpg".into());
        edition.publisher = Some("Scholastic".into());
        edition.publication_date = Some("1999".into());
        edition.page_count = Some(341);
        edition.language = Some("en".into());
        edition.format = Some("hardcover".into());
        edition.cover_medium = Some("https://example.com/medium.jpg".into());
        edition.cover_small = Some("https://example.com/small.jpg".into());

        let score = edition_completeness(&edition, 20);
        assert_eq!(score, 100);
    }

    #[test]
    fn edition_completeness_title_only() {
        let edition = sample_edition();
        assert_eq!(edition_completeness(&edition, 0), 10);
    }

    #[test]
    fn long_description_wins_over_short_bucket() {
        let mut work = Work::new(WorkKey::parse("/works/OL1W").unwrap(), "Title".into());
        work.description = Some("x".repeat(250));
        let score = work_completeness(&work, 0);
        assert_eq!(score, 25); // title(10) + description(15)
    }

    #[test]
    fn author_completeness_accumulates_weights() {
        let mut author = Author::new(
            alexandria_model::AuthorKey::parse("/authors/OL1A").unwrap(),
            "Ursula K. Le Guin".to_string(),
        );
        assert_eq!(author_completeness(&author, 0), 0);
        author.bio = Some("...".into());
        author.nationality = Some("American".into());
        assert_eq!(author_completeness(&author, 0), 30);
    }

    #[test]
    fn provider_bonus_tiers() {
        assert_eq!(provider_bonus(None, true), 50);
        assert_eq!(provider_bonus(Some(ProviderType::Paid), false), 40);
        assert_eq!(provider_bonus(Some(ProviderType::Free), false), 30);
        assert_eq!(provider_bonus(Some(ProviderType::Ai), false), 20);
    }

    #[test]
    fn merge_policy_writes_new_row() {
        assert_eq!(decide_merge(None, 80, false), MergeDecision::WriteNew);
    }

    #[test]
    fn merge_policy_requires_significant_improvement() {
        assert_eq!(decide_merge(Some(50), 61, false), MergeDecision::WriteImproved);
        assert_eq!(decide_merge(Some(50), 55, false), MergeDecision::Skip);
        assert_eq!(decide_merge(Some(50), 55, true), MergeDecision::FieldFillOnly);
    }
}
