//! Non-blocking analytics emission. Events are handed to the sink on a
//! spawned task so the request path never waits on delivery; the resources
//! an event closes over (not just a borrow of them) are moved into the task
//! so they stay alive until it completes.

use std::sync::Arc;

use tracing::warn;

use alexandria_contracts::analytics::{AnalyticsEvent, AnalyticsSink};

/// Emits `event` on a detached task. `sink` is `Arc`-cloned into the task so
/// the emit call never blocks the caller and never depends on the caller's
/// stack surviving.
pub fn emit(sink: Arc<dyn AnalyticsSink>, event: AnalyticsEvent) {
    tokio::spawn(async move {
        sink.emit(event).await;
    });
}

/// Emits a provider_request event, logging the classification locally too
/// so operators without an analytics backend still see it.
pub fn emit_provider_request(
    sink: Arc<dyn AnalyticsSink>,
    event: alexandria_contracts::analytics::ProviderRequestEvent,
) {
    if event.status == alexandria_contracts::analytics::CallStatus::Error {
        warn!(provider = %event.provider, capability = %event.capability, error_type = ?event.error_type, "provider request failed");
    }
    emit(sink, AnalyticsEvent::ProviderRequest(event));
}

pub fn emit_orchestrator_fallback(
    sink: Arc<dyn AnalyticsSink>,
    event: alexandria_contracts::analytics::OrchestratorFallbackEvent,
) {
    emit(sink, AnalyticsEvent::OrchestratorFallback(event));
}

pub fn emit_provider_cost(sink: Arc<dyn AnalyticsSink>, event: alexandria_contracts::analytics::ProviderCostEvent) {
    emit(sink, AnalyticsEvent::ProviderCost(event));
}
