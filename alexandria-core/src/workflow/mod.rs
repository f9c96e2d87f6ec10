//! Durable, subrequest-budget-bounded workflows. Unlike the queue consumers,
//! a workflow run drives many steps itself rather than reacting to one
//! message per invocation.

pub mod author_harvest;
pub mod monthly_backfill;

pub use author_harvest::AuthorHarvestRunner;
pub use monthly_backfill::MonthlyBackfillRunner;
