use crate::ids::{AuthorKey, WorkKey};
use serde::{Deserialize, Serialize};

/// (work_key, author_key) link with an author position. Unique on
/// (work_key, author_key); never removed implicitly, only added
/// idempotently ("insert on conflict do nothing").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkAuthorLink {
    pub work_key: WorkKey,
    pub author_key: AuthorKey,
    pub author_order: u32,
}

impl WorkAuthorLink {
    /// `author_order` is 1-based (`author_order >= 1`).
    pub fn new(work_key: WorkKey, author_key: AuthorKey, author_order: u32) -> Self {
        Self {
            work_key,
            author_key,
            author_order: author_order.max(1),
        }
    }
}
