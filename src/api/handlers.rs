use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{
    EventName, InvalidOrder, Order, SettingsUpdate, SettingsView, UnknownEventName,
    UpsertOrderRequest,
};
use crate::storage::{load_settings_for_update, Storage, StorageError};

pub struct AppState {
    pub storage: Arc<dyn Storage>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct EventOption {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    UnknownEvent(#[from] UnknownEventName),
    #[error(transparent)]
    InvalidOrder(#[from] InvalidOrder),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::UnknownEvent(_) | ApiError::InvalidOrder(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(err) => {
                tracing::error!(error = %err, "storage operation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let error = match &self {
            ApiError::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Current settings with the access token masked
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingsView>, ApiError> {
    let settings = state.storage.load_settings().await?;
    Ok(Json(settings.masked()))
}

/// Sanitise and store settings; omitted fields keep their value
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SettingsUpdate>,
) -> Result<Json<SettingsView>, ApiError> {
    let current = load_settings_for_update(state.storage.as_ref()).await?;
    let settings = payload.apply(&current)?;
    state.storage.save_settings(&settings).await?;

    tracing::info!(
        event = %settings.event_name,
        configured = settings.is_complete(),
        "tracking settings updated"
    );

    Ok(Json(settings.masked()))
}

/// The closed list of event names
pub async fn list_events() -> Json<Vec<EventOption>> {
    Json(
        EventName::ALL
            .into_iter()
            .map(|event| EventOption {
                value: event.as_str(),
                label: event.label(),
            })
            .collect(),
    )
}

/// Insert or replace an order used for conversion values
pub async fn upsert_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<i64>,
    Json(payload): Json<UpsertOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = payload.into_order(order_id)?;
    state.storage.upsert_order(&order).await?;

    Ok((StatusCode::OK, Json(order)))
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
