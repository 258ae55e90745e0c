use crate::models::{Order, Settings};
use crate::storage::{Storage, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

const SETTINGS_KEY: u8 = 1;

/// Cached storage wrapper that keeps the settings record in memory
///
/// Settings are read on every page request, so they are served from a
/// short-lived Moka cache and invalidated whenever they are saved through
/// this wrapper. Order lookups pass straight through.
pub struct CachedStorage {
    /// Underlying storage implementation
    inner: Arc<dyn Storage>,
    settings_cache: Cache<u8, Settings>,
}

impl CachedStorage {
    pub fn new(inner: Arc<dyn Storage>, ttl_secs: u64) -> Self {
        let settings_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            inner,
            settings_cache,
        }
    }
}

#[async_trait]
impl Storage for CachedStorage {
    async fn init(&self) -> Result<()> {
        self.inner.init().await
    }

    async fn load_settings(&self) -> StorageResult<Settings> {
        if let Some(cached) = self.settings_cache.get(&SETTINGS_KEY).await {
            return Ok(cached);
        }

        let settings = self.inner.load_settings().await?;
        self.settings_cache
            .insert(SETTINGS_KEY, settings.clone())
            .await;

        Ok(settings)
    }

    async fn save_settings(&self, settings: &Settings) -> StorageResult<()> {
        self.inner.save_settings(settings).await?;

        // Writes that bypass this wrapper show up once the TTL expires
        self.settings_cache.invalidate(&SETTINGS_KEY).await;

        Ok(())
    }

    async fn find_order(&self, order_id: i64) -> StorageResult<Option<Order>> {
        self.inner.find_order(order_id).await
    }

    async fn upsert_order(&self, order: &Order) -> StorageResult<()> {
        self.inner.upsert_order(order).await
    }
}
