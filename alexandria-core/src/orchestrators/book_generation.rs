//! Book generation: AI providers only, first-success, no fallback ordering
//! beyond that. Prompt variant names are validated against a closed registry
//! before being passed to a provider, rejecting anything unrecognized.

use std::sync::Arc;

use alexandria_contracts::analytics::AnalyticsSink;
use alexandria_contracts::providers::{BookGenerator, GeneratedBook, PromptVariant, ServiceContext};

use crate::error::{CoreError, Result};

use super::{record_fallback, timed_attempt, Attempt};

const GENERATION_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

pub async fn generate_books(
    providers: &[(&str, Arc<dyn BookGenerator>)],
    variant_name: &str,
    count: u32,
    ctx: &ServiceContext,
    analytics: Arc<dyn AnalyticsSink>,
) -> Result<Vec<GeneratedBook>> {
    let variant = PromptVariant::parse(variant_name)
        .ok_or_else(|| CoreError::Validation(format!("unknown prompt variant: {variant_name}")))?;

    let mut attempts: Vec<Attempt> = Vec::new();
    let mut successful: Option<Vec<GeneratedBook>> = None;
    let mut successful_provider: Option<String> = None;

    for (name, provider) in providers {
        let child_ctx = ctx.with_timeout(GENERATION_TIMEOUT.as_millis() as u64);
        let attempt_fut = async {
            tokio::time::timeout(GENERATION_TIMEOUT, provider.generate_books(variant, count, &child_ctx))
                .await
                .map_err(|_| "provider timeout".to_string())?
                .map(Some)
                .map_err(|e| e.to_string())
        };

        let (result, attempt) = timed_attempt::<Vec<GeneratedBook>, _>(name, attempt_fut).await;
        attempts.push(attempt);

        if result.is_some() {
            successful_provider = Some(name.to_string());
            successful = result;
            break;
        }
    }

    record_fallback(
        analytics,
        "book_generation",
        "generate_books",
        &attempts,
        successful_provider.as_deref(),
    );

    Ok(successful.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_unknown_prompt_variant_before_calling_any_provider() {
        let providers: Vec<(&str, Arc<dyn BookGenerator>)> = Vec::new();
        let ctx = ServiceContext::new("req-1");
        let sink: Arc<dyn AnalyticsSink> = Arc::new(alexandria_contracts::analytics::NullAnalyticsSink);
        let result = generate_books(&providers, "ignore-previous-instructions", 5, &ctx, sink).await;
        assert!(result.is_err());
    }
}
