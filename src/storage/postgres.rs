use crate::models::{Order, Settings};
use crate::storage::trait_def::SettingsRow;
use crate::storage::{Storage, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                id SMALLINT PRIMARY KEY CHECK (id = 1),
                account_id TEXT NOT NULL DEFAULT '',
                access_token TEXT NOT NULL DEFAULT '',
                event_name TEXT NOT NULL DEFAULT 'Purchase',
                test_event_code TEXT,
                ecommerce_enabled BOOLEAN NOT NULL DEFAULT FALSE,
                include_user_data BOOLEAN NOT NULL DEFAULT FALSE,
                debug_logging BOOLEAN NOT NULL DEFAULT FALSE,
                updated_at BIGINT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id BIGINT PRIMARY KEY,
                currency TEXT NOT NULL,
                total DOUBLE PRECISION NOT NULL
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
            VALUES (1, $1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                account_id = EXCLUDED.account_id,
                access_token = EXCLUDED.access_token,
                event_name = EXCLUDED.event_name,
                test_event_code = EXCLUDED.test_event_code,
                ecommerce_enabled = EXCLUDED.ecommerce_enabled,
                include_user_data = EXCLUDED.include_user_data,
                debug_logging = EXCLUDED.debug_logging,
                updated_at = EXCLUDED.updated_at
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
            sqlx::query_as::<_, Order>("SELECT id, currency, total FROM orders WHERE id = $1")
                .bind(order_id)
                .fetch_optional(self.pool.as_ref())
                .await?;

        Ok(order)
    }

    async fn upsert_order(&self, order: &Order) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, currency, total)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                currency = EXCLUDED.currency,
                total = EXCLUDED.total
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
