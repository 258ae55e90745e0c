use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;

use super::event::ConversionPayload;
use crate::config::TrackingConfig;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid conversions endpoint: {0}")]
    Endpoint(String),
    #[error("conversions request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("conversions API rejected the event [{status}]: {body}")]
    Rejected { status: u16, body: String },
}

/// Successful response from the conversions endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub status: u16,
    pub body: String,
}

/// Destination for assembled conversion payloads
#[async_trait]
pub trait ConversionSink: Send + Sync {
    async fn send(
        &self,
        account_id: &str,
        access_token: &str,
        payload: &ConversionPayload,
    ) -> Result<DeliveryReport, RelayError>;
}

/// Conversions API client: one JSON POST per event, no retries
#[derive(Clone)]
pub struct GraphApiClient {
    client: Client,
    base_url: String,
    api_version: String,
}

impl GraphApiClient {
    pub fn new(base_url: &str, api_version: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("clickrelay/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for the conversions API")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.trim_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &TrackingConfig) -> Result<Self> {
        Self::new(
            &config.graph_api_base,
            &config.graph_api_version,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// `<base>/<version>/<account>/events?access_token=<token>`
    pub fn events_url(&self, account_id: &str, access_token: &str) -> Result<Url, RelayError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|err| RelayError::Endpoint(err.to_string()))?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RelayError::Endpoint(format!("{} cannot be a base", self.base_url)))?;
            segments
                .pop_if_empty()
                .extend([self.api_version.as_str(), account_id, "events"]);
        }

        url.query_pairs_mut()
            .append_pair("access_token", access_token);

        Ok(url)
    }
}

#[async_trait]
impl ConversionSink for GraphApiClient {
    async fn send(
        &self,
        account_id: &str,
        access_token: &str,
        payload: &ConversionPayload,
    ) -> Result<DeliveryReport, RelayError> {
        let url = self.events_url(account_id, access_token)?;

        let response = self.client.post(url).json(payload).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            Ok(DeliveryReport {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(RelayError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
