pub mod cached;
pub mod postgres;
pub mod sqlite;
pub mod trait_def;

pub use cached::CachedStorage;
pub use postgres::PostgresStorage;
pub use sqlite::SqliteStorage;
pub use trait_def::{Storage, StorageError, StorageResult};

use crate::config::{DatabaseBackend, DatabaseConfig};
use crate::models::Settings;
use std::sync::Arc;

/// Open the configured backend and make sure its tables exist
pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.backend {
        DatabaseBackend::Sqlite => {
            tracing::info!("Using SQLite storage: {}", config.url);
            Arc::new(SqliteStorage::new(&config.url, config.max_connections).await?)
        }
        DatabaseBackend::Postgres => {
            tracing::info!("Using PostgreSQL storage");
            Arc::new(PostgresStorage::new(&config.url, config.max_connections).await?)
        }
    };

    storage.init().await?;
    Ok(storage)
}

/// Settings to base an update on.
///
/// A stored row with an unknown event name comes back with the default event
/// instead of failing, so saving the update repairs the row.
pub async fn load_settings_for_update(storage: &dyn Storage) -> StorageResult<Settings> {
    match storage.load_settings().await {
        Err(StorageError::InvalidSettings { source, repaired }) => {
            tracing::warn!(error = %source, "stored settings are invalid, updating a repaired copy");
            Ok(*repaired)
        }
        other => other,
    }
}
