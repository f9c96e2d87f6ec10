//! Daily-budget guard for the single paid provider. Counter resets at UTC
//! midnight with no rollover; the manager is the only caller authorized to
//! advance it, and it does so only from the paid provider's `on_call` hook.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use alexandria_contracts::quota::{QuotaConfig, QuotaManager, QuotaStatus};

use crate::error::Result;

struct DayCounter {
    day: NaiveDate,
    count: AtomicI64,
}

/// In-process quota manager. Sufficient for a single server instance; a
/// multi-instance deployment would back this with a shared counter (Redis
/// `INCR`) instead, behind the same `QuotaManager` trait.
pub struct InMemoryQuotaManager {
    config: QuotaConfig,
    state: RwLock<DayCounter>,
}

impl std::fmt::Debug for InMemoryQuotaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryQuotaManager").field("config", &self.config).finish()
    }
}

impl InMemoryQuotaManager {
    pub fn new(config: QuotaConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: RwLock::new(DayCounter {
                day: Utc::now().date_naive(),
                count: AtomicI64::new(0),
            }),
        })
    }

    async fn used_today(&self) -> i64 {
        let today = Utc::now().date_naive();
        {
            let guard = self.state.read().await;
            if guard.day == today {
                return guard.count.load(Ordering::SeqCst);
            }
        }
        let mut guard = self.state.write().await;
        if guard.day != today {
            guard.day = today;
            guard.count.store(0, Ordering::SeqCst);
        }
        guard.count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuotaManager for InMemoryQuotaManager {
    async fn can_make_calls(&self, n: i64) -> Result<bool> {
        let used = self.used_today().await;
        Ok(used + n <= self.config.daily_limit - self.config.buffer)
    }

    async fn record_api_call(&self, n: i64) -> Result<()> {
        let today = Utc::now().date_naive();
        let mut guard = self.state.write().await;
        if guard.day != today {
            guard.day = today;
            guard.count.store(0, Ordering::SeqCst);
        }
        guard.count.fetch_add(n, Ordering::SeqCst);
        Ok(())
    }

    async fn remaining(&self) -> Result<i64> {
        let used = self.used_today().await;
        Ok((self.config.daily_limit - self.config.buffer - used).max(0))
    }

    async fn status(&self) -> Result<QuotaStatus> {
        let used = self.used_today().await;
        let remaining = (self.config.daily_limit - self.config.buffer - used).max(0);
        Ok(QuotaStatus {
            daily_limit: self.config.daily_limit,
            buffer: self.config.buffer,
            used_today: used,
            remaining,
            can_make_calls: remaining > 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn can_make_calls_respects_effective_budget() {
        let manager = InMemoryQuotaManager::new(QuotaConfig::default());
        assert!(manager.can_make_calls(13_000).await.unwrap());
        assert!(!manager.can_make_calls(13_001).await.unwrap());
    }

    #[tokio::test]
    async fn record_api_call_advances_counter_and_remaining_shrinks() {
        let manager = InMemoryQuotaManager::new(QuotaConfig::default());
        manager.record_api_call(5_000).await.unwrap();
        assert_eq!(manager.remaining().await.unwrap(), 8_000);
    }

    #[tokio::test]
    async fn remaining_never_goes_negative() {
        let manager = InMemoryQuotaManager::new(QuotaConfig::default());
        manager.record_api_call(20_000).await.unwrap();
        assert_eq!(manager.remaining().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn conservative_batch_size_caps_at_half_remaining() {
        let manager = InMemoryQuotaManager::new(QuotaConfig::default());
        manager.record_api_call(12_900).await.unwrap();
        // remaining = 100, half = 50
        let size = manager.conservative_batch_size(1000, 100, 1).await.unwrap();
        assert_eq!(size, 50);
    }

    #[tokio::test]
    async fn require_buffer_for_cron_reserves_half_for_manual_use() {
        let manager = InMemoryQuotaManager::new(QuotaConfig::default());
        manager.record_api_call(12_950).await.unwrap();
        // remaining = 50, n=30 * multiplier 2 = 60 > 50
        assert!(!manager.require_buffer_for_cron(30, 2).await.unwrap());
        assert!(manager.require_buffer_for_cron(20, 2).await.unwrap());
    }
}
