//! Request-scoped bundle of handles and policy passed to every provider and
//! orchestrator call. Immutable per call path; orchestrators derive a
//! narrower child context per attempt via `ServiceContext::with_timeout`.

use std::sync::Arc;

use alexandria_contracts::analytics::AnalyticsSink;
use alexandria_contracts::providers::ServiceContext;
use alexandria_contracts::quota::QuotaManager;

use crate::http_client::HttpClient;

/// Environment handles a request carries in addition to the plain
/// `ServiceContext` value: the shared HTTP client, an optional quota
/// manager (required for paid-provider calls), and an optional analytics
/// sink.
#[derive(Clone)]
pub struct RequestEnv {
    pub http: Arc<tokio::sync::Mutex<HttpClient>>,
    pub quota: Option<Arc<dyn QuotaManager>>,
    pub analytics: Arc<dyn AnalyticsSink>,
}

impl std::fmt::Debug for RequestEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestEnv")
            .field("quota", &self.quota.is_some())
            .finish()
    }
}

/// Builds the immutable `ServiceContext` value for a new inbound request,
/// applying the documented defaults (cache read-write, rate limiting
/// enforced).
pub fn create_service_context(request_id: impl Into<String>) -> ServiceContext {
    ServiceContext::new(request_id)
}
