use std::sync::Arc;

use sha2::{Digest, Sha256};
use time::Duration;
use tracing::{debug, info, warn};

use super::capture::{sanitize_click_id, CLICK_COOKIE};
use super::client::{ConversionSink, DeliveryReport, RelayError};
use super::event::{ConversionEvent, ConversionPayload};
use super::DiagnosticLog;
use crate::context::{ClientStorage, RequestContext};
use crate::models::{EventName, Order, Settings};
use crate::storage::Storage;

pub const SUPPRESSION_PREFIX: &str = "crelay_fired_";
pub const SUPPRESSION_WINDOW: Duration = Duration::hours(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AdminRequest,
    MissingConfiguration,
    AlreadyRelayed,
    NoClickId,
}

#[derive(Debug)]
pub enum RelayOutcome {
    Skipped(SkipReason),
    Delivered(DeliveryReport),
    Failed(RelayError),
}

impl RelayOutcome {
    /// Whether an outbound call was made
    pub fn attempted(&self) -> bool {
        !matches!(self, RelayOutcome::Skipped(_))
    }
}

/// Cookie name marking (event, page) as already relayed.
///
/// Query strings never reach the key and trailing slashes are ignored, so
/// `/thanks`, `/thanks/` and `/thanks?utm_source=x` share one marker.
pub fn suppression_key(event: EventName, path: &str) -> String {
    let digest = Sha256::digest(format!("{}|{}", event.as_str(), normalize_path(path)));
    let hex = format!("{digest:x}");
    format!("{SUPPRESSION_PREFIX}{}", &hex[..32])
}

fn normalize_path(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Relays one conversion per (event, page) for visitors that arrived via an ad click
pub struct Relay {
    storage: Arc<dyn Storage>,
    sink: Arc<dyn ConversionSink>,
    diagnostics: DiagnosticLog,
}

impl Relay {
    pub fn new(
        storage: Arc<dyn Storage>,
        sink: Arc<dyn ConversionSink>,
        diagnostics: DiagnosticLog,
    ) -> Self {
        Self {
            storage,
            sink,
            diagnostics,
        }
    }

    /// Render the conversion marker; the marker itself never produces output.
    pub async fn render_marker(
        &self,
        ctx: &RequestContext,
        settings: &Settings,
        client: &mut ClientStorage,
        order_ref: Option<i64>,
    ) -> String {
        let outcome = self.fire(ctx, settings, client, order_ref).await;
        debug!(path = %ctx.path, ?outcome, "conversion marker rendered");
        String::new()
    }

    pub async fn fire(
        &self,
        ctx: &RequestContext,
        settings: &Settings,
        client: &mut ClientStorage,
        order_ref: Option<i64>,
    ) -> RelayOutcome {
        if ctx.is_admin {
            return RelayOutcome::Skipped(SkipReason::AdminRequest);
        }

        if !settings.is_complete() {
            return RelayOutcome::Skipped(SkipReason::MissingConfiguration);
        }

        let once_key = suppression_key(settings.event_name, &ctx.path);
        if client.contains(&once_key) {
            return RelayOutcome::Skipped(SkipReason::AlreadyRelayed);
        }

        // Only attributed traffic is reported
        let Some(token) = client.get(CLICK_COOKIE).and_then(sanitize_click_id) else {
            return RelayOutcome::Skipped(SkipReason::NoClickId);
        };

        let order = self.lookup_order(order_ref).await;
        let now = chrono::Utc::now().timestamp();
        let event = ConversionEvent::build(ctx, settings, &token, now, order.as_ref());
        let payload = ConversionPayload::new(event, settings.test_event_code.clone());

        self.diagnostics
            .record(
                settings.debug_logging,
                &format!(
                    "Firing conversion event: {} | click id: {} | URL: {}",
                    settings.event_name,
                    token,
                    ctx.full_url()
                ),
            )
            .await;
        if settings.debug_logging {
            match serde_json::to_string(&payload) {
                Ok(json) => {
                    self.diagnostics
                        .record(true, &format!("API payload: {json}"))
                        .await
                }
                Err(err) => warn!(error = %err, "failed to encode payload for diagnostics"),
            }
        }

        let outcome = match self
            .sink
            .send(&settings.account_id, &settings.access_token, &payload)
            .await
        {
            Ok(report) => {
                info!(event = %settings.event_name, status = report.status, "conversion relayed");
                self.diagnostics
                    .record(
                        settings.debug_logging,
                        &format!("API response [{}]: {}", report.status, report.body),
                    )
                    .await;
                RelayOutcome::Delivered(report)
            }
            Err(err) => {
                warn!(event = %settings.event_name, error = %err, "conversion relay failed");
                self.diagnostics
                    .record(settings.debug_logging, &format!("API error: {err}"))
                    .await;
                RelayOutcome::Failed(err)
            }
        };

        // Marked regardless of the outcome so a reload does not retry
        client.set(&once_key, "1", SUPPRESSION_WINDOW, ctx.secure);

        outcome
    }

    async fn lookup_order(&self, order_ref: Option<i64>) -> Option<Order> {
        let order_id = order_ref.filter(|id| *id > 0)?;
        match self.storage.find_order(order_id).await {
            Ok(order) => order,
            Err(err) => {
                warn!(order_id, error = %err, "order lookup failed, relaying without order data");
                None
            }
        }
    }
}
