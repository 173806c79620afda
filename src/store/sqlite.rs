use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{self, Row};
use tracing::{info, warn};

use crate::error::StoreError;
use crate::player::PlayerId;

use super::{BalanceStore, DAILY_COOLDOWN_KEY, DEFAULT_DAILY_COOLDOWN_MINUTES};

/// SQLite-backed store with a `users` table and a `settings` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Returns pool options suitable for this store.
    #[must_use]
    pub fn pool() -> SqlitePoolOptions {
        SqlitePoolOptions::new()
    }

    /// Wraps an existing pool. Call [`SqliteStore::migrate`] before use.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if missing) the database at `url` and migrates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the database cannot be
    /// opened or migrated.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = Self::pool()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        info!(url, "opened balance database");
        Ok(store)
    }

    /// Creates the tables if needed and seeds default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let mut transaction = self.pool.begin().await?;

        let queries = [
            r"CREATE TABLE IF NOT EXISTS users
               (
                   user_id          TEXT PRIMARY KEY,
                   currency         INTEGER DEFAULT 0,
                   last_daily_claim TIMESTAMP
               )",
            r"CREATE TABLE IF NOT EXISTS settings
               (
                   key   TEXT PRIMARY KEY,
                   value TEXT
               )",
        ];
        for query in queries {
            sqlx::query(query).execute(&mut *transaction).await?;
        }

        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES ($1, $2)")
            .bind(DAILY_COOLDOWN_KEY)
            .bind(DEFAULT_DAILY_COOLDOWN_MINUTES.to_string())
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;
        Ok(())
    }

    async fn ensure_user(&self, player: &PlayerId) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO users (user_id, currency) VALUES ($1, 0)")
            .bind(player.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Parses a stored claim time. Values without an offset are taken as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

#[async_trait]
impl BalanceStore for SqliteStore {
    async fn get_balance(&self, player: &PlayerId) -> Result<i64, StoreError> {
        self.ensure_user(player).await?;
        let row = sqlx::query("SELECT currency FROM users WHERE user_id = $1")
            .bind(player.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<Option<i64>, _>("currency")?.unwrap_or(0))
    }

    async fn add_balance(&self, player: &PlayerId, delta: i64) -> Result<i64, StoreError> {
        let mut transaction = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO users (user_id, currency) VALUES ($1, 0)")
            .bind(player.as_str())
            .execute(&mut *transaction)
            .await?;

        let row = sqlx::query(
            r"
            UPDATE users
            SET currency = MAX(COALESCE(currency, 0) + $1, 0)
            WHERE user_id = $2
            RETURNING currency
            ",
        )
        .bind(delta)
        .bind(player.as_str())
        .fetch_one(&mut *transaction)
        .await?;
        let balance: i64 = row.try_get("currency")?;

        transaction.commit().await?;
        Ok(balance)
    }

    async fn last_daily_claim(
        &self,
        player: &PlayerId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.ensure_user(player).await?;
        let row = sqlx::query("SELECT last_daily_claim FROM users WHERE user_id = $1")
            .bind(player.as_str())
            .fetch_one(&self.pool)
            .await?;
        let raw: Option<String> = row.try_get("last_daily_claim")?;

        Ok(raw.and_then(|raw| {
            let parsed = parse_timestamp(&raw);
            if parsed.is_none() {
                warn!(%player, raw, "ignoring unparsable daily claim timestamp");
            }
            parsed
        }))
    }

    async fn set_last_daily_claim(
        &self,
        player: &PlayerId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.ensure_user(player).await?;
        sqlx::query("UPDATE users SET last_daily_claim = $1 WHERE user_id = $2")
            .bind(at.to_rfc3339())
            .bind(player.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_daily_claim(
        &self,
        player: &PlayerId,
        at: DateTime<Utc>,
        reward: i64,
    ) -> Result<i64, StoreError> {
        let mut transaction = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO users (user_id, currency) VALUES ($1, 0)")
            .bind(player.as_str())
            .execute(&mut *transaction)
            .await?;

        let row = sqlx::query(
            r"
            UPDATE users
            SET currency = MAX(COALESCE(currency, 0) + $1, 0),
                last_daily_claim = $2
            WHERE user_id = $3
            RETURNING currency
            ",
        )
        .bind(reward)
        .bind(at.to_rfc3339())
        .bind(player.as_str())
        .fetch_one(&mut *transaction)
        .await?;
        let balance: i64 = row.try_get("currency")?;

        transaction.commit().await?;
        Ok(balance)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row
            .map(|row| row.try_get::<Option<String>, _>("value"))
            .transpose()?
            .flatten())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES ($1, $2)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
