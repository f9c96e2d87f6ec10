//! Named registry of providers. Registration is idempotent-failure: adding a
//! duplicate name fails loudly rather than silently replacing. A single
//! process-wide instance is expected in production; `clear()` exists for
//! tests only.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;

use alexandria_contracts::providers::Provider;
use alexandria_model::{Capability, ProviderType};

use crate::error::{CoreError, Result};

const DEFAULT_AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry").finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    pub by_type: HashMap<&'static str, usize>,
    pub by_capability: HashMap<Capability, usize>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, provider: Arc<dyn Provider>) -> Result<()> {
        let name = provider.name().to_string();
        let mut guard = self.providers.write().await;
        if guard.contains_key(&name) {
            return Err(CoreError::Validation(format!(
                "provider '{name}' is already registered"
            )));
        }
        guard.insert(name, provider);
        Ok(())
    }

    pub async fn register_all(&self, providers: Vec<Arc<dyn Provider>>) -> Result<()> {
        for provider in providers {
            self.register(provider).await?;
        }
        Ok(())
    }

    /// Test-only: empties the registry.
    pub async fn clear(&self) {
        self.providers.write().await.clear();
    }

    pub async fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.read().await.get(name).cloned()
    }

    pub async fn get_all(&self) -> Vec<Arc<dyn Provider>> {
        self.providers.read().await.values().cloned().collect()
    }

    pub async fn get_by_capability(&self, capability: Capability) -> Vec<Arc<dyn Provider>> {
        self.providers
            .read()
            .await
            .values()
            .filter(|p| p.declares(capability))
            .cloned()
            .collect()
    }

    pub async fn get_by_type(&self, provider_type: ProviderType) -> Vec<Arc<dyn Provider>> {
        self.providers
            .read()
            .await
            .values()
            .filter(|p| p.provider_type() == provider_type)
            .cloned()
            .collect()
    }

    pub async fn has_capability(&self, capability: Capability) -> bool {
        self.providers.read().await.values().any(|p| p.declares(capability))
    }

    /// Fans out `is_available` for every provider declaring `capability`,
    /// bounded by `timeout` per check. Checks that time out are treated as
    /// unavailable and logged; the call is expected to be invoked once per
    /// orchestration, not in a hot loop.
    pub async fn get_available_providers(
        &self,
        capability: Capability,
        timeout: Option<Duration>,
    ) -> Vec<Arc<dyn Provider>> {
        let timeout = timeout.unwrap_or(DEFAULT_AVAILABILITY_TIMEOUT);
        let candidates = self.get_by_capability(capability).await;

        let checks = candidates.into_iter().map(|provider| {
            let provider = provider.clone();
            async move {
                match tokio::time::timeout(timeout, provider.is_available()).await {
                    Ok(true) => Some(provider),
                    Ok(false) => None,
                    Err(_) => {
                        warn!(provider = provider.name(), "availability check timed out");
                        None
                    }
                }
            }
        });

        futures::future::join_all(checks).await.into_iter().flatten().collect()
    }

    pub async fn stats(&self) -> RegistryStats {
        let guard = self.providers.read().await;
        let mut stats = RegistryStats::default();
        for provider in guard.values() {
            let key = match provider.provider_type() {
                ProviderType::Free => "free",
                ProviderType::Paid => "paid",
                ProviderType::Ai => "ai",
            };
            *stats.by_type.entry(key).or_insert(0) += 1;
            for capability in Capability::all() {
                if provider.declares(*capability) {
                    *stats.by_capability.entry(*capability).or_insert(0) += 1;
                }
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alexandria_model::ProviderType;
    use async_trait::async_trait;

    struct FakeProvider {
        name: &'static str,
        provider_type: ProviderType,
        capabilities: Vec<Capability>,
        available: bool,
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }
        fn provider_type(&self) -> ProviderType {
            self.provider_type
        }
        fn capabilities(&self) -> &[Capability] {
            &self.capabilities
        }
        async fn is_available(&self) -> bool {
            self.available
        }
    }

    #[tokio::test]
    async fn duplicate_registration_fails_loudly() {
        let registry = ProviderRegistry::new();
        let provider = Arc::new(FakeProvider {
            name: "openlibrary",
            provider_type: ProviderType::Free,
            capabilities: vec![Capability::MetadataEnrichment],
            available: true,
        });
        registry.register(provider.clone()).await.unwrap();
        let err = registry.register(provider).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn get_available_providers_filters_unavailable() {
        let registry = ProviderRegistry::new();
        registry
            .register(Arc::new(FakeProvider {
                name: "openlibrary",
                provider_type: ProviderType::Free,
                capabilities: vec![Capability::MetadataEnrichment],
                available: true,
            }))
            .await
            .unwrap();
        registry
            .register(Arc::new(FakeProvider {
                name: "isbndb",
                provider_type: ProviderType::Paid,
                capabilities: vec![Capability::MetadataEnrichment],
                available: false,
            }))
            .await
            .unwrap();

        let available = registry
            .get_available_providers(Capability::MetadataEnrichment, None)
            .await;
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].name(), "openlibrary");
    }
}
