use crate::error::{ModelError, Result};
use std::fmt;

/// A validated, digit-normalized ISBN-10 or ISBN-13.
///
/// Construction always validates the checksum; there is no way to hold an
/// `Isbn` with the wrong length, a bad checksum, or non `[0-9X]` characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Isbn(String);

impl Isbn {
    /// Normalizes (strips hyphens/spaces, uppercases a trailing `x`) and
    /// validates `raw` as an ISBN-10 or ISBN-13.
    pub fn parse(raw: &str) -> Result<Self> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();

        match cleaned.len() {
            10 => {
                if is_valid_isbn10(&cleaned) {
                    Ok(Self(cleaned))
                } else {
                    Err(ModelError::InvalidIsbn(raw.to_string()))
                }
            }
            13 => {
                if is_valid_isbn13(&cleaned) {
                    Ok(Self(cleaned))
                } else {
                    Err(ModelError::InvalidIsbn(raw.to_string()))
                }
            }
            _ => Err(ModelError::InvalidIsbn(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_isbn13(&self) -> bool {
        self.0.len() == 13
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Isbn {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn is_valid_isbn10(s: &str) -> bool {
    let mut sum: u32 = 0;
    for (i, c) in s.chars().enumerate() {
        let digit = if i == 9 && c == 'X' {
            10
        } else if let Some(d) = c.to_digit(10) {
            d
        } else {
            return false;
        };
        sum += (10 - i as u32) * digit;
    }
    sum % 11 == 0
}

fn is_valid_isbn13(s: &str) -> bool {
    if !(s.starts_with("978") || s.starts_with("979")) {
        return false;
    }
    let mut sum: u32 = 0;
    for (i, c) in s.chars().enumerate() {
        let Some(digit) = c.to_digit(10) else {
            return false;
        };
        let weight = if i % 2 == 0 { 1 } else { 3 };
        sum += weight * digit;
    }
    sum % 10 == 0
}

/// Identifies an abstract Work: either an upstream OpenLibrary key
/// (`/works/OLxxxW`) or a synthetic key minted by the enrichment core.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkKey(String);

impl WorkKey {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(ModelError::InvalidWorkKey(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Mints a synthetic key of the form `/works/isbndb-<8hex>`, used when a
    /// paid-provider-resolved edition has no upstream work.
    pub fn synthetic_isbndb(hex8: &str) -> Self {
        Self(format!("/works/isbndb-{hex8}"))
    }

    /// Mints a synthetic key of the form `synthetic:<slug>:<author-slug>`,
    /// used for AI-backfilled works.
    pub fn synthetic_ai(title_slug: &str, author_slug: &str) -> Self {
        Self(format!("synthetic:{title_slug}:{author_slug}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_synthetic(&self) -> bool {
        self.0.contains("isbndb-") || self.0.starts_with("synthetic:")
    }
}

impl fmt::Display for WorkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies an Author: either an upstream OpenLibrary key
/// (`/authors/OL...A`) or a synthetic key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuthorKey(String);

impl AuthorKey {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(ModelError::InvalidAuthorKey(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn synthetic(hex8: &str) -> Self {
        Self(format!("/authors/isbndb-{hex8}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_synthetic(&self) -> bool {
        self.0.contains("isbndb-")
    }
}

impl fmt::Display for AuthorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalizes an author name for exact-match lookups: lowercase, punctuation
/// and repeated whitespace collapsed. Two names that normalize equal are
/// considered the same author.
pub fn normalize_author_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_space = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_isbn13_978_and_979() {
        assert!(Isbn::parse("9780439064873").is_ok());
        assert!(Isbn::parse("9791234567896").is_ok());
    }

    #[test]
    fn accepts_isbn10_with_terminal_x() {
        // 080442957X is a valid ISBN-10 with a check digit of X.
        assert!(Isbn::parse("080442957X").is_ok());
    }

    #[test]
    fn rejects_other_lengths_and_bad_checksums() {
        assert!(Isbn::parse("12345").is_err());
        assert!(Isbn::parse("9780439064870").is_err());
        assert!(Isbn::parse("0804429571").is_err());
    }

    #[test]
    fn normalizes_hyphens_and_case() {
        let a = Isbn::parse("978-0-439-06487-3").unwrap();
        assert_eq!(a.as_str(), "9780439064873");
        let b = Isbn::parse("080442957x").unwrap();
        assert_eq!(b.as_str(), "080442957X");
    }

    #[test]
    fn normalize_author_name_collapses_punctuation_and_case() {
        assert_eq!(normalize_author_name("J. K.  Rowling"), "j k rowling");
        assert_eq!(normalize_author_name("j k rowling"), "j k rowling");
    }

    #[test]
    fn synthetic_work_key_is_detected() {
        let key = WorkKey::synthetic_isbndb("deadbeef");
        assert!(key.is_synthetic());
        let upstream = WorkKey::parse("/works/OL1234W").unwrap();
        assert!(!upstream.is_synthetic());
    }
}
