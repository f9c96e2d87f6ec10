//! Trait surfaces shared by `alexandria-core` and `alexandria-server`: the
//! capability provider interfaces, the queue/quota/analytics abstractions,
//! the closed error enum, and the author-harvest workflow's request/summary
//! types. No concrete implementations live here.

pub mod analytics;
pub mod error;
pub mod providers;
pub mod queue;
pub mod quota;
pub mod workflow;

pub mod prelude {
    pub use crate::analytics::{
        AnalyticsEvent, AnalyticsSink, CallStatus, NullAnalyticsSink, OrchestratorFallbackEvent,
        ProviderCostEvent, ProviderRequestEvent,
    };
    pub use crate::error::{AlexandriaError, Result};
    pub use crate::providers::{
        AuthorBibliographyProvider, AuthorBiographyProvider, BibliographyBook, BookGenerator,
        BookMetadata, CacheStrategy, CoverProvider, CoverResult, GeneratedBook, IsbnResolution,
        IsbnResolver, MetadataProvider, Provider, PromptVariant, PublicDomainProvider,
        PublicDomainReason, PublicDomainResult, RateLimitStrategy, ServiceContext,
    };
    pub use crate::queue::{
        AuthorJob, CoverJob, EnrichmentJob, JobKind, JobLease, JobOutcome, JobPayload,
        JobPriority, LeaseId, QueueService, BATCH_CONCURRENCY, MAX_RETRIES,
    };
    pub use crate::quota::{QuotaConfig, QuotaManager, QuotaStatus};
    pub use crate::workflow::{
        AuthorTier, BackfillRequest, BackfillSummary, HarvestBatchSummary, HarvestRequest,
        HarvestRunStatus, HarvestSummary,
    };
}
