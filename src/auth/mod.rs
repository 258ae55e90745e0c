use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;

pub const API_KEY_HEADER: &str = "X-API-Key";

pub struct AuthService {
    enabled: bool,
    api_keys: Arc<Vec<String>>,
}

impl AuthService {
    pub fn new(enabled: bool, api_keys: Vec<String>) -> Self {
        Self {
            enabled,
            api_keys: Arc::new(api_keys),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.enabled, config.api_keys.clone())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn validate_key(&self, key: &str) -> bool {
        // If authentication is disabled, allow all requests
        if !self.enabled {
            return true;
        }

        if key.is_empty() {
            return false;
        }

        self.api_keys
            .iter()
            .any(|k| bool::from(k.as_bytes().ct_eq(key.as_bytes())))
    }
}

pub async fn auth_middleware(
    auth_service: Arc<AuthService>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if auth_service.validate_key(api_key) {
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), "rejected admin request without a valid API key");
        (StatusCode::UNAUTHORIZED, "Invalid or missing API key").into_response()
    }
}
