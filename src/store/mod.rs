//! Balance and settings persistence.
//!
//! The engine never touches a store; the [`Table`](crate::table::Table) reads
//! and adjusts balances around each round through [`BalanceStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::player::PlayerId;

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Setting key holding the daily cooldown in minutes.
pub const DAILY_COOLDOWN_KEY: &str = "daily_cooldown_minutes";

/// Cooldown seeded into a fresh store, in minutes.
pub const DEFAULT_DAILY_COOLDOWN_MINUTES: u32 = 120;

/// Key-value store for user balances and bot settings.
///
/// Unknown players are created lazily with a balance of zero.
#[async_trait]
pub trait BalanceStore: Send + Sync {
    /// Returns the player's balance.
    async fn get_balance(&self, player: &PlayerId) -> Result<i64, StoreError>;

    /// Adds `delta` (negative to deduct) and returns the new balance.
    ///
    /// The update is atomic per player and never leaves a balance below zero.
    async fn add_balance(&self, player: &PlayerId, delta: i64) -> Result<i64, StoreError>;

    /// Returns when the player last claimed the daily reward.
    async fn last_daily_claim(&self, player: &PlayerId)
    -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Records a daily reward claim.
    async fn set_last_daily_claim(
        &self,
        player: &PlayerId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Records a daily claim made at `at` and credits `reward`, returning the
    /// new balance.
    ///
    /// The default records the claim before crediting, so a failure can
    /// only lose a reward, never grant a second one. Stores that can do
    /// both in one transaction override it.
    async fn record_daily_claim(
        &self,
        player: &PlayerId,
        at: DateTime<Utc>,
        reward: i64,
    ) -> Result<i64, StoreError> {
        self.set_last_daily_claim(player, at).await?;
        self.add_balance(player, reward).await
    }

    /// Returns a setting value.
    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Inserts or replaces a setting value.
    async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
