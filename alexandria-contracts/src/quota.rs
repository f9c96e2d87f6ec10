use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub daily_limit: i64,
    pub buffer: i64,
    /// Ceiling on calls a single bulk operation may consume.
    pub bulk_operation_ceiling: i64,
    /// Scheduled jobs must leave `remaining >= n * cron_multiplier`.
    pub cron_multiplier: i64,
    /// Multiplier applied to half the remaining budget when sizing a
    /// conservative batch.
    pub batch_multiplier: i64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: 15_000,
            buffer: 2_000,
            bulk_operation_ceiling: 100,
            cron_multiplier: 2,
            batch_multiplier: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub daily_limit: i64,
    pub buffer: i64,
    pub used_today: i64,
    pub remaining: i64,
    pub can_make_calls: bool,
}

/// Guards the single paid provider's shared daily budget. The manager is the
/// only caller authorized to advance the counter; it resets at UTC midnight
/// with no rollover.
#[async_trait]
pub trait QuotaManager: Send + Sync {
    async fn can_make_calls(&self, n: i64) -> Result<bool>;

    /// Atomic increment of the UTC-date counter. The only legitimate caller
    /// is the paid provider's HTTP client `onCall` hook.
    async fn record_api_call(&self, n: i64) -> Result<()>;

    async fn remaining(&self) -> Result<i64>;

    async fn status(&self) -> Result<QuotaStatus>;

    /// `min(max_batch, floor(remaining/2) * batch_multiplier)`, so a single
    /// operation never consumes more than half of what's left today.
    async fn conservative_batch_size(
        &self,
        desired: i64,
        max_batch: i64,
        batch_multiplier: i64,
    ) -> Result<i64> {
        let remaining = self.remaining().await?;
        let half = (remaining / 2) * batch_multiplier;
        Ok(desired.min(max_batch).min(half.max(0)))
    }

    /// For scheduled jobs: demands `remaining >= n * cron_multiplier` to
    /// reserve half of what's left for manual/interactive use.
    async fn require_buffer_for_cron(&self, n: i64, cron_multiplier: i64) -> Result<bool> {
        let remaining = self.remaining().await?;
        Ok(remaining >= n * cron_multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_effective_budget() {
        let cfg = QuotaConfig::default();
        assert_eq!(cfg.daily_limit, 15_000);
        assert_eq!(cfg.buffer, 2_000);
        assert_eq!(cfg.daily_limit - cfg.buffer, 13_000);
    }
}
