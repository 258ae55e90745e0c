use crate::models::{Order, Settings};
use crate::storage::trait_def::SettingsRow;
use crate::storage::{Storage, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        // Single-row settings table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                account_id TEXT NOT NULL DEFAULT '',
                access_token TEXT NOT NULL DEFAULT '',
                event_name TEXT NOT NULL DEFAULT 'Purchase',
                test_event_code TEXT,
                ecommerce_enabled INTEGER NOT NULL DEFAULT 0,
                include_user_data INTEGER NOT NULL DEFAULT 0,
                debug_logging INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY,
                currency TEXT NOT NULL,
                total REAL NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn load_settings(&self) -> StorageResult<Settings> {
        let row = sqlx::query_as::<_, SettingsRow>(
            r#"
            SELECT account_id, access_token, event_name, test_event_code,
                   ecommerce_enabled, include_user_data, debug_logging
            FROM settings
            WHERE id = 1
            "#,
        )
        .fetch_optional(self.pool.as_ref())
        .await?;

        match row {
            Some(row) => Settings::try_from(row),
            None => Ok(Settings::default()),
        }
    }

    async fn save_settings(&self, settings: &Settings) -> StorageResult<()> {
        let updated_at = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO settings (
                id, account_id, access_token, event_name, test_event_code,
                ecommerce_enabled, include_user_data, debug_logging, updated_at
            )
            VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                account_id = excluded.account_id,
                access_token = excluded.access_token,
                event_name = excluded.event_name,
                test_event_code = excluded.test_event_code,
                ecommerce_enabled = excluded.ecommerce_enabled,
                include_user_data = excluded.include_user_data,
                debug_logging = excluded.debug_logging,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&settings.account_id)
        .bind(&settings.access_token)
        .bind(settings.event_name.as_str())
        .bind(settings.test_event_code.as_deref())
        .bind(settings.ecommerce_enabled)
        .bind(settings.include_user_data)
        .bind(settings.debug_logging)
        .bind(updated_at)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn find_order(&self, order_id: i64) -> StorageResult<Option<Order>> {
        let order =
            sqlx::query_as::<_, Order>("SELECT id, currency, total FROM orders WHERE id = ?")
                .bind(order_id)
                .fetch_optional(self.pool.as_ref())
                .await?;

        Ok(order)
    }

    async fn upsert_order(&self, order: &Order) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, currency, total)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                currency = excluded.currency,
                total = excluded.total
            "#,
        )
        .bind(order.id)
        .bind(&order.currency)
        .bind(order.total)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}
