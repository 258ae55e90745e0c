use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    Extension,
};
use std::sync::Arc;

use crate::context::{append_set_cookies, ClientStorage, ContextOptions, RequestContext};
use crate::models::Settings;
use crate::storage::Storage;
use crate::tracking::{DiagnosticLog, Relay};

/// Query parameter carrying the order reference on conversion pages
pub const ORDER_ID_PARAM: &str = "order_id";

pub struct SiteState {
    pub storage: Arc<dyn Storage>,
    pub relay: Relay,
    pub diagnostics: DiagnosticLog,
    pub context_options: ContextOptions,
    pub conversion_paths: Vec<String>,
    /// Order confirmation pages, `<prefix>/<order id>`; fire only with e-commerce enabled
    pub order_received_path: Option<String>,
}

impl SiteState {
    /// Settings for this request; failures leave tracking unconfigured
    pub async fn load_settings(&self) -> Settings {
        match self.storage.load_settings().await {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load settings, tracking disabled for this request");
                Settings::default()
            }
        }
    }

    pub fn is_conversion_path(&self, path: &str) -> bool {
        let path = trim_path(path);
        self.conversion_paths
            .iter()
            .any(|candidate| trim_path(candidate) == path)
    }

    /// Order id of an order confirmation page such as `/checkout/order-received/1001/`
    pub fn order_received_id(&self, path: &str) -> Option<i64> {
        let prefix = trim_path(self.order_received_path.as_deref()?);
        if prefix == "/" {
            return None;
        }

        path.strip_prefix(prefix)?
            .strip_prefix('/')?
            .split('/')
            .next()?
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
    }

    /// Whether this page renders the marker, and with which order reference
    fn marker_for(&self, ctx: &RequestContext, settings: &Settings) -> Option<Option<i64>> {
        if ctx.method != Method::GET {
            return None;
        }

        if let Some(order_id) = self.order_received_id(&ctx.path) {
            return settings.ecommerce_enabled.then_some(Some(order_id));
        }

        if !self.is_conversion_path(&ctx.path) {
            return None;
        }

        let order_ref = if settings.ecommerce_enabled {
            ctx.query_param(ORDER_ID_PARAM)
                .and_then(|value| value.trim().parse::<i64>().ok())
        } else {
            None
        };
        Some(order_ref)
    }
}

fn trim_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Render a site page; conversion pages carry the conversion marker
pub async fn render_page(
    State(state): State<Arc<SiteState>>,
    Extension(ctx): Extension<RequestContext>,
    Extension(settings): Extension<Settings>,
    Extension(mut client): Extension<ClientStorage>,
) -> impl IntoResponse {
    let mut headers = HeaderMap::new();

    let Some(order_ref) = state.marker_for(&ctx, &settings) else {
        return (StatusCode::NO_CONTENT, headers, String::new());
    };

    let body = state
        .relay
        .render_marker(&ctx, &settings, &mut client, order_ref)
        .await;

    append_set_cookies(&mut headers, client.pending());
    (StatusCode::NO_CONTENT, headers, body)
}
