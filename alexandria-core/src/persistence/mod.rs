//! Postgres + Redis persistence: connection setup, the queue and
//! work-resolution repository implementations, and the quality-gated
//! write-back adapters.

pub mod adapters;
pub mod backfill_log;
pub mod cache;
pub mod object_store;
pub mod postgres;
pub mod queue_postgres;
pub mod work_resolution;

pub use adapters::PostgresAdapters;
pub use backfill_log::BackfillLogStore;
pub use cache::RedisCache;
pub use object_store::{CoverObjectStore, CoverSize, S3CoverObjectStore, StoredCover};
pub use queue_postgres::PostgresQueueService;
pub use work_resolution::PostgresWorkResolutionRepository;
