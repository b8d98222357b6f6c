use crate::models::Notification;
use crate::store::NotificationStore;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn NotificationStore>,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponseBody {
    pub notification_id: Uuid,
    pub user_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub notification_type: String,
    pub subject: String,
    pub message: String,
    pub recipient: String,
    pub status: String,
    pub sent_at: Option<DateTime<Utc>>,
}

impl From<Notification> for NotificationResponseBody {
    fn from(n: Notification) -> Self {
        Self {
            notification_id: n.id,
            user_id: n.user_id,
            booking_id: n.booking_id,
            notification_type: n.notification_type.to_string(),
            subject: n.subject,
            message: n.message,
            recipient: n.recipient,
            status: n.status.to_string(),
            sent_at: n.sent_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/notifications/by-user/:user_id", get(get_by_user))
        .route("/notifications/by-booking/:booking_id", get(get_by_booking))
        .route("/notifications/pending", get(get_pending))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

async fn get_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<NotificationResponseBody>>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.get_by_user(user_id).await {
        Ok(notifications) => Ok(Json(notifications.into_iter().map(Into::into).collect())),
        Err(e) => {
            tracing::error!("Failed to load notifications: {}", e);
            Err(internal_error(format!("Failed to load notifications: {}", e)))
        }
    }
}

async fn get_by_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Vec<NotificationResponseBody>>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.get_by_booking(booking_id).await {
        Ok(notifications) => Ok(Json(notifications.into_iter().map(Into::into).collect())),
        Err(e) => {
            tracing::error!("Failed to load notifications: {}", e);
            Err(internal_error(format!("Failed to load notifications: {}", e)))
        }
    }
}

async fn get_pending(
    State(state): State<AppState>,
) -> Result<Json<Vec<NotificationResponseBody>>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.get_pending().await {
        Ok(notifications) => Ok(Json(notifications.into_iter().map(Into::into).collect())),
        Err(e) => {
            tracing::error!("Failed to load pending notifications: {}", e);
            Err(internal_error(format!("Failed to load pending notifications: {}", e)))
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

fn internal_error(message: String) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: message }))
}
