use crate::handlers::{AiCommands, RecommendationPreferences, SendChatMessage};
use crate::models::ChatMessage;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<AiCommands>,
}

#[derive(Debug, Deserialize)]
pub struct SendChatMessageRequest {
    pub user_id: String,
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendChatMessageResponseBody {
    pub response: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub departure_date: Option<NaiveDate>,
    #[serde(default)]
    pub preferred_class: Option<String>,
    #[serde(default)]
    pub max_budget: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponseBody {
    pub recommendations: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ChatHistoryResponseBody {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chat/send", post(send_chat_message))
        .route("/chat/history/:user_id", get(get_chat_history))
        .route("/chat/session/:session_id", get(get_session_history))
        .route("/recommendations", get(get_recommendations))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

async fn send_chat_message(
    State(state): State<AppState>,
    Json(request): Json<SendChatMessageRequest>,
) -> Result<Json<SendChatMessageResponseBody>, (StatusCode, Json<ErrorResponse>)> {
    let command = SendChatMessage {
        user_id: request.user_id,
        message: request.message,
        session_id: request.session_id,
    };

    match state.commands.send_chat_message(command).await {
        Ok(response) => Ok(Json(SendChatMessageResponseBody {
            response: response.response,
            session_id: response.session_id,
            timestamp: response.timestamp,
        })),
        Err(e) => {
            tracing::error!("Failed to process chat message: {}", e);
            Err(internal_error(format!(
                "Failed to process chat message: {}",
                e
            )))
        }
    }
}

async fn get_recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<RecommendationsResponseBody>, (StatusCode, Json<ErrorResponse>)> {
    let max_budget = match query.max_budget {
        Some(raw) => Some(
            BigDecimal::try_from(raw)
                .map_err(|e| internal_error(format!("invalid budget: {}", e)))?,
        ),
        None => None,
    };

    let recommendations = state
        .commands
        .get_flight_recommendations(RecommendationPreferences {
            origin: query.origin,
            destination: query.destination,
            departure_date: query.departure_date,
            preferred_class: query.preferred_class,
            max_budget,
        })
        .await;

    Ok(Json(RecommendationsResponseBody {
        recommendations,
        generated_at: Utc::now(),
    }))
}

async fn get_chat_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ChatHistoryResponseBody>, (StatusCode, Json<ErrorResponse>)> {
    match state.commands.get_chat_history(&user_id).await {
        Ok(messages) => Ok(Json(ChatHistoryResponseBody { messages })),
        Err(e) => {
            tracing::error!("Failed to load chat history: {}", e);
            Err(internal_error(format!("Failed to load chat history: {}", e)))
        }
    }
}

async fn get_session_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ChatHistoryResponseBody>, (StatusCode, Json<ErrorResponse>)> {
    match state.commands.get_session_history(&session_id).await {
        Ok(messages) => Ok(Json(ChatHistoryResponseBody { messages })),
        Err(e) => {
            tracing::error!("Failed to load session history: {}", e);
            Err(internal_error(format!(
                "Failed to load session history: {}",
                e
            )))
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

fn internal_error(message: String) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: message }))
}
