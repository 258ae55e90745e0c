//! Admin API integration tests
//!
//! These tests verify the settings, events and orders endpoints, including
//! input sanitisation and API key enforcement.

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    response::Response,
    Router,
};
use clickrelay::api::create_api_router;
use clickrelay::auth::{AuthService, API_KEY_HEADER};
use clickrelay::models::{EventName, Settings};
use clickrelay::storage::{SqliteStorage, Storage, StorageError};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const TEST_KEY: &str = "test-admin-key";

async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn create_app(storage: Arc<dyn Storage>) -> Router {
    let auth = Arc::new(AuthService::new(true, vec![TEST_KEY.to_string()]));
    create_api_router(storage, auth)
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(API_KEY_HEADER, TEST_KEY);

    match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_requires_api_key() {
    let app = create_app(create_test_storage().await);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/settings")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/settings")
                .header(API_KEY_HEADER, "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Health stays public
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "message": "OK" }));
}

#[tokio::test]
async fn test_default_settings() {
    let app = create_app(create_test_storage().await);

    let response = app
        .oneshot(request(Method::GET, "/api/settings", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["account_id"], "");
    assert_eq!(body["access_token"], "");
    assert_eq!(body["event_name"], "Purchase");
    assert_eq!(body["test_event_code"], Value::Null);
    assert_eq!(body["include_user_data"], false);
}

#[tokio::test]
async fn test_update_sanitizes_and_masks() {
    let storage = create_test_storage().await;
    let app = create_app(Arc::clone(&storage));

    let response = app
        .clone()
        .oneshot(request(
            Method::PUT,
            "/api/settings",
            Some(json!({
                "account_id": "1234-5678 ",
                "access_token": " EAABtoken9876 ",
                "event_name": "Lead",
                "test_event_code": "TEST1",
                "include_user_data": true
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["account_id"], "12345678");
    assert_eq!(body["access_token"], "********9876");
    assert_eq!(body["event_name"], "Lead");

    let stored = storage.load_settings().await.unwrap();
    assert_eq!(stored.account_id, "12345678");
    assert_eq!(stored.access_token, "EAABtoken9876");
    assert_eq!(stored.event_name, EventName::Lead);
    assert_eq!(stored.test_event_code.as_deref(), Some("TEST1"));
    assert!(stored.include_user_data);
    assert!(!stored.debug_logging);

    // Partial update keeps the rest
    let response = app
        .oneshot(request(
            Method::PUT,
            "/api/settings",
            Some(json!({ "debug_logging": true })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = storage.load_settings().await.unwrap();
    assert!(stored.debug_logging);
    assert_eq!(stored.account_id, "12345678");
    assert_eq!(stored.event_name, EventName::Lead);
}

#[tokio::test]
async fn test_unknown_event_rejected() {
    let storage = create_test_storage().await;
    let app = create_app(Arc::clone(&storage));

    let response = app
        .oneshot(request(
            Method::PUT,
            "/api/settings",
            Some(json!({ "account_id": "1", "event_name": "Refund" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("Refund"));

    // Nothing was stored
    assert_eq!(storage.load_settings().await.unwrap().account_id, "");
}

#[tokio::test]
async fn test_update_repairs_unknown_stored_event() {
    let path = std::env::temp_dir().join(format!(
        "clickrelay-repair-{}-{}.db",
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    let url = format!("sqlite://{}?mode=rwc", path.display());

    let sqlite = SqliteStorage::new(&url, 1).await.unwrap();
    sqlite.init().await.unwrap();
    sqlite
        .save_settings(&Settings {
            account_id: "999".to_string(),
            access_token: "T".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    let storage: Arc<dyn Storage> = Arc::new(sqlite);

    // A row written outside the admin surface
    let raw = sqlx::SqlitePool::connect(&url).await.unwrap();
    sqlx::query("UPDATE settings SET event_name = 'Donate' WHERE id = 1")
        .execute(&raw)
        .await
        .unwrap();
    raw.close().await;

    assert!(matches!(
        storage.load_settings().await,
        Err(StorageError::InvalidSettings { .. })
    ));

    let app = create_app(Arc::clone(&storage));
    let response = app
        .oneshot(request(
            Method::PUT,
            "/api/settings",
            Some(json!({ "event_name": "Lead" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stored = storage.load_settings().await.unwrap();
    assert_eq!(stored.event_name, EventName::Lead);
    assert_eq!(stored.account_id, "999");
    assert_eq!(stored.access_token, "T");

    drop(storage);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_list_events() {
    let app = create_app(create_test_storage().await);

    let response = app
        .oneshot(request(Method::GET, "/api/events", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let events = body.as_array().unwrap();
    assert_eq!(events.len(), EventName::ALL.len());
    assert!(events
        .iter()
        .any(|e| e["value"] == "CompleteRegistration" && e["label"] == "Complete Registration"));
}

#[tokio::test]
async fn test_upsert_order() {
    let storage = create_test_storage().await;
    let app = create_app(Arc::clone(&storage));

    let response = app
        .clone()
        .oneshot(request(
            Method::PUT,
            "/api/orders/77",
            Some(json!({ "currency": "eur", "total": 12.5 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let order = storage.find_order(77).await.unwrap().unwrap();
    assert_eq!(order.currency, "EUR");
    assert_eq!(order.total, 12.5);

    let response = app
        .clone()
        .oneshot(request(
            Method::PUT,
            "/api/orders/78",
            Some(json!({ "currency": "euro", "total": 1.0 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["error"],
        "Currency must be a three-letter ISO 4217 code"
    );
    assert_eq!(storage.find_order(78).await.unwrap(), None);

    let response = app
        .oneshot(request(
            Method::PUT,
            "/api/orders/0",
            Some(json!({ "currency": "USD", "total": 1.0 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
