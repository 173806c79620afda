use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::StoreError;
use crate::player::PlayerId;

use super::{BalanceStore, DAILY_COOLDOWN_KEY, DEFAULT_DAILY_COOLDOWN_MINUTES};

#[derive(Debug, Clone, Default)]
struct UserRecord {
    currency: i64,
    last_daily_claim: Option<DateTime<Utc>>,
}

/// In-process store, used for tests and `database_url: memory`.
#[derive(Debug)]
pub struct MemoryStore {
    users: DashMap<PlayerId, UserRecord>,
    settings: DashMap<String, String>,
}

impl MemoryStore {
    /// Creates a store holding only the default settings.
    #[must_use]
    pub fn new() -> Self {
        let settings = DashMap::new();
        settings.insert(
            DAILY_COOLDOWN_KEY.to_string(),
            DEFAULT_DAILY_COOLDOWN_MINUTES.to_string(),
        );
        Self {
            users: DashMap::new(),
            settings,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BalanceStore for MemoryStore {
    async fn get_balance(&self, player: &PlayerId) -> Result<i64, StoreError> {
        Ok(self.users.entry(player.clone()).or_default().currency)
    }

    async fn add_balance(&self, player: &PlayerId, delta: i64) -> Result<i64, StoreError> {
        // The entry guard holds the shard lock for the whole read-modify-write.
        let mut record = self.users.entry(player.clone()).or_default();
        record.currency = record.currency.saturating_add(delta).max(0);
        Ok(record.currency)
    }

    async fn last_daily_claim(
        &self,
        player: &PlayerId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.users.entry(player.clone()).or_default().last_daily_claim)
    }

    async fn set_last_daily_claim(
        &self,
        player: &PlayerId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.users.entry(player.clone()).or_default().last_daily_claim = Some(at);
        Ok(())
    }

    async fn record_daily_claim(
        &self,
        player: &PlayerId,
        at: DateTime<Utc>,
        reward: i64,
    ) -> Result<i64, StoreError> {
        let mut record = self.users.entry(player.clone()).or_default();
        record.last_daily_claim = Some(at);
        record.currency = record.currency.saturating_add(reward).max(0);
        Ok(record.currency)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.settings.get(key).map(|value| value.clone()))
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.settings.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
