use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Success,
    Error,
    Timeout,
    CacheHit,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderRequestEvent {
    pub provider: String,
    pub capability: String,
    pub operation: String,
    pub status: CallStatus,
    pub error_type: Option<String>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub quota_consumed: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrchestratorFallbackEvent {
    pub orchestrator: String,
    pub provider_chain: Vec<String>,
    pub successful_provider: Option<String>,
    pub operation: String,
    pub attempts_count: u32,
    pub total_latency_ms: u64,
    pub success: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderCostEvent {
    pub provider: String,
    pub tier: String,
    pub api_calls_count: i64,
    pub estimated_cost_usd: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AnalyticsEvent {
    ProviderRequest(ProviderRequestEvent),
    OrchestratorFallback(OrchestratorFallbackEvent),
    ProviderCost(ProviderCostEvent),
}

/// Fire-and-forget event sink. Implementations must not block the request
/// path; when absent, events are silently dropped.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn emit(&self, event: AnalyticsEvent);
}

/// A sink that drops every event. Used when analytics is not configured.
#[derive(Debug, Default)]
pub struct NullAnalyticsSink;

#[async_trait]
impl AnalyticsSink for NullAnalyticsSink {
    async fn emit(&self, _event: AnalyticsEvent) {}
}
