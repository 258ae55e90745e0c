use crate::models::{EventName, Order, Settings, UnknownEventName};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::FromRow;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The stored event name is outside the closed list. `repaired` is the
    /// same row with the default event name.
    #[error("stored settings are invalid: {source}")]
    InvalidSettings {
        source: UnknownEventName,
        repaired: Box<Settings>,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn init(&self) -> Result<()>;

    /// Load the tracking settings; an unconfigured site yields the defaults
    async fn load_settings(&self) -> StorageResult<Settings>;

    /// Replace the tracking settings
    async fn save_settings(&self, settings: &Settings) -> StorageResult<()>;

    /// Look up an order referenced by a conversion page
    async fn find_order(&self, order_id: i64) -> StorageResult<Option<Order>>;

    /// Insert or replace an order
    async fn upsert_order(&self, order: &Order) -> StorageResult<()>;
}

/// Row shape shared by the SQL backends
#[derive(Debug, FromRow)]
pub(crate) struct SettingsRow {
    pub account_id: String,
    pub access_token: String,
    pub event_name: String,
    pub test_event_code: Option<String>,
    pub ecommerce_enabled: bool,
    pub include_user_data: bool,
    pub debug_logging: bool,
}

impl TryFrom<SettingsRow> for Settings {
    type Error = StorageError;

    fn try_from(row: SettingsRow) -> StorageResult<Self> {
        let parsed = row.event_name.parse::<EventName>();
        let settings = Settings {
            account_id: row.account_id,
            access_token: row.access_token,
            event_name: parsed.as_ref().copied().unwrap_or_default(),
            test_event_code: row.test_event_code.filter(|code| !code.is_empty()),
            ecommerce_enabled: row.ecommerce_enabled,
            include_user_data: row.include_user_data,
            debug_logging: row.debug_logging,
        };

        match parsed {
            Ok(_) => Ok(settings),
            Err(source) => Err(StorageError::InvalidSettings {
                source,
                repaired: Box::new(settings),
            }),
        }
    }
}
