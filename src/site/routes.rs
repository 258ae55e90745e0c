use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{render_page, SiteState};
use super::middleware::capture_click_id;
use crate::api::handlers::health_check;

pub fn create_site_router(state: Arc<SiteState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .fallback(render_page)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            capture_click_id,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
