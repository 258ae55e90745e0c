use time::Duration;

use super::DiagnosticLog;
use crate::context::{ClientStorage, RequestContext};
use crate::models::{sanitize_text, Settings};

/// Query parameter carrying the ad click identifier
pub const CLICK_ID_PARAM: &str = "fbclid";
/// Cookie holding the most recent click identifier
pub const CLICK_COOKIE: &str = "crelay_fbclid";
pub const CLICK_RETENTION: Duration = Duration::days(7);

const MAX_CLICK_ID_CHARS: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedClick {
    pub token: String,
    pub captured_at: i64,
}

/// Reduce a raw click identifier to characters that are safe in a cookie value.
pub fn sanitize_click_id(raw: &str) -> Option<String> {
    let token: String = sanitize_text(raw)
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ',' | ';' | '\\'))
        .take(MAX_CLICK_ID_CHARS)
        .collect();

    (!token.is_empty()).then_some(token)
}

/// Store the click identifier from the query, if any, overwriting older captures.
pub fn capture_click(ctx: &RequestContext, client: &mut ClientStorage) -> Option<CapturedClick> {
    if ctx.is_admin {
        return None;
    }

    let token = ctx.query_param(CLICK_ID_PARAM).and_then(sanitize_click_id)?;
    client.set(CLICK_COOKIE, &token, CLICK_RETENTION, ctx.secure);

    Some(CapturedClick {
        token,
        captured_at: chrono::Utc::now().timestamp(),
    })
}

/// [`capture_click`] plus a diagnostic log entry for each capture
pub async fn capture(
    ctx: &RequestContext,
    settings: &Settings,
    client: &mut ClientStorage,
    diagnostics: &DiagnosticLog,
) -> Option<CapturedClick> {
    let captured = capture_click(ctx, client)?;

    tracing::debug!(path = %ctx.path, "captured click identifier");
    diagnostics
        .record(
            settings.debug_logging,
            &format!(
                "Captured click id from URL: {} | captured at: {} | URL: {}",
                captured.token, captured.captured_at, ctx.request_uri
            ),
        )
        .await;

    Some(captured)
}
