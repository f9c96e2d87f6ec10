//! Domain types shared by the Alexandria enrichment core: editions, works,
//! authors, their link table, identifiers, and the closed capability enums.
//! This crate performs no I/O.

pub mod author;
pub mod backfill;
pub mod capability;
pub mod edition;
pub mod error;
pub mod ids;
pub mod link;
pub mod work;

pub use author::Author;
pub use backfill::BackfillLog;
pub use capability::{Capability, CoverSize, CoverSource, ProviderType};
pub use edition::Edition;
pub use error::{ModelError, Result};
pub use ids::{normalize_author_name, AuthorKey, Isbn, WorkKey};
pub use link::WorkAuthorLink;
pub use work::Work;
