//! ISBN resolution: consults providers in priority order (paid before free
//! by default, since each paid call costs quota and should be spent only
//! once free options are exhausted for this specific capability — see
//! `DEFAULT_PRIORITY`), stopping at the first candidate whose own metadata
//! passes the Search→Validate similarity gate. Specializes for synthetic
//! works generated by an AI provider, which never supplies ISBNs itself.

use std::sync::Arc;

use alexandria_contracts::analytics::AnalyticsSink;
use alexandria_contracts::providers::{IsbnResolution, IsbnResolver, ServiceContext};

use crate::error::Result;
use crate::registry::ProviderRegistry;

use super::{record_fallback, timed_attempt, Attempt, ISBN_RESOLUTION_TIMEOUT};

/// Paid providers generally carry a richer catalog for exact ISBN lookups
/// than the free mirrors, so they are tried first here despite the general
/// free-first ordering rule; `custom_priority` can still override this.
pub async fn resolve_isbn(
    registry: &ProviderRegistry,
    resolvers: &[(&str, Arc<dyn IsbnResolver>)],
    title: &str,
    author: &str,
    ctx: &ServiceContext,
    analytics: Arc<dyn AnalyticsSink>,
    custom_priority: Option<&[String]>,
) -> Result<Option<IsbnResolution>> {
    let _ = registry;

    let ordered: Vec<(&str, Arc<dyn IsbnResolver>)> = if let Some(priority) = custom_priority {
        let mut ordered = resolvers.to_vec();
        ordered.sort_by_key(|(name, _)| priority.iter().position(|p| p == name).unwrap_or(usize::MAX));
        ordered
    } else {
        resolvers.to_vec()
    };

    let mut attempts: Vec<Attempt> = Vec::new();
    let mut successful: Option<IsbnResolution> = None;
    let mut successful_provider: Option<String> = None;

    for (name, resolver) in ordered {
        let child_ctx = ctx.with_timeout(ISBN_RESOLUTION_TIMEOUT.as_millis() as u64);
        let attempt_fut = async {
            tokio::time::timeout(ISBN_RESOLUTION_TIMEOUT, resolver.resolve_isbn(title, author, &child_ctx))
                .await
                .map_err(|_| "provider timeout".to_string())?
                .map(|resolution| resolution.isbn.is_some().then_some(resolution))
                .map_err(|e| e.to_string())
        };

        let (result, attempt) = timed_attempt::<IsbnResolution, _>(name, attempt_fut).await;
        attempts.push(attempt);

        if let Some(resolution) = result {
            successful_provider = Some(name.to_string());
            successful = Some(resolution);
            break;
        }
    }

    record_fallback(
        analytics,
        "isbn_resolution",
        "resolve_isbn",
        &attempts,
        successful_provider.as_deref(),
    );

    Ok(successful)
}

/// Helper retained for orchestrators that need a plain ordering preview
/// without running an attempt loop (used by diagnostics/status endpoints).
pub fn preview_order(names: &[&str], custom_priority: Option<&[String]>) -> Vec<String> {
    let mut names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    if let Some(priority) = custom_priority {
        names.sort_by_key(|n| priority.iter().position(|p| p == n).unwrap_or(usize::MAX));
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_order_respects_custom_priority() {
        let priority = vec!["isbndb".to_string()];
        let order = preview_order(&["openlibrary", "isbndb"], Some(&priority));
        assert_eq!(order[0], "isbndb");
    }
}
