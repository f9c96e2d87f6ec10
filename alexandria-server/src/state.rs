//! Process-wide shared state handed to every handler via axum's `State`
//! extractor. One `AppState` is built in `main` and cloned (cheaply, via
//! `Arc`) into the router.

use std::sync::Arc;

use alexandria_config::Config;
use alexandria_contracts::analytics::AnalyticsSink;
use alexandria_contracts::quota::QuotaManager;
use alexandria_contracts::queue::QueueService;

use alexandria_core::dedup::WorkResolutionRepository;
use alexandria_core::http_client::HttpClient;
use alexandria_core::persistence::{BackfillLogStore, CoverObjectStore, PostgresAdapters};
use alexandria_core::providers::ProviderSet;
use alexandria_core::registry::ProviderRegistry;
use alexandria_core::service_context::RequestEnv;

use crate::jobs::JobStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub providers: Arc<ProviderSet>,
    pub registry: Arc<ProviderRegistry>,
    pub adapters: Arc<PostgresAdapters>,
    pub resolver: Arc<dyn WorkResolutionRepository>,
    pub queue: Arc<dyn QueueService>,
    pub quota: Arc<dyn QuotaManager>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub covers: Arc<dyn CoverObjectStore>,
    pub backfill_log: Arc<BackfillLogStore>,
    pub http: Arc<tokio::sync::Mutex<HttpClient>>,
    pub jobs: JobStore,
}

impl AppState {
    /// Bundles the per-request environment `alexandria-core`'s orchestrators
    /// and workflow runners expect.
    pub fn request_env(&self) -> RequestEnv {
        RequestEnv { http: self.http.clone(), quota: Some(self.quota.clone()), analytics: self.analytics.clone() }
    }
}
