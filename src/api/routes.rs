use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::{self, Next},
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthService};
use crate::storage::Storage;

use super::handlers::{
    get_settings, health_check, list_events, update_settings, upsert_order, AppState,
};

pub fn create_api_router(storage: Arc<dyn Storage>, auth_service: Arc<AuthService>) -> Router {
    let state = Arc::new(AppState { storage });

    let protected_routes = Router::new()
        .route("/api/settings", get(get_settings).put(update_settings))
        .route("/api/events", get(list_events))
        .route("/api/orders/{id}", put(upsert_order))
        .route_layer(middleware::from_fn(move |headers: HeaderMap, req: Request, next: Next| {
            let auth = Arc::clone(&auth_service);
            auth_middleware(auth, headers, req, next)
        }))
        .with_state(Arc::clone(&state));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
}
