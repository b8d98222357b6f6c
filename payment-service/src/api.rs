use crate::handlers::{PaymentCommands, ProcessPayment};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<PaymentCommands>,
}

#[derive(Debug, Deserialize)]
pub struct ProcessPaymentRequest {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub payment_method: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Serialize)]
pub struct ProcessPaymentResponseBody {
    pub payment_id: Uuid,
    pub status: String,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponseBody {
    pub payment_id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub payment_method: String,
    pub status: String,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/payments", post(process_payment))
        .route("/payments/by-booking/:booking_id", get(get_payment_by_booking))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

async fn process_payment(
    State(state): State<AppState>,
    Json(request): Json<ProcessPaymentRequest>,
) -> Result<Json<ProcessPaymentResponseBody>, (StatusCode, Json<ErrorResponse>)> {
    let amount = BigDecimal::try_from(request.amount)
        .map_err(|e| internal_error(format!("invalid amount: {}", e)))?;

    let command = ProcessPayment {
        booking_id: request.booking_id,
        user_id: request.user_id,
        amount,
        currency: request.currency,
        payment_method: request.payment_method,
    };

    match state.commands.process_payment(command).await {
        Ok(response) => Ok(Json(ProcessPaymentResponseBody {
            payment_id: response.payment_id,
            status: response.status.to_string(),
            transaction_id: response.transaction_id,
        })),
        Err(e) => {
            tracing::error!("Failed to process payment: {}", e);
            Err(internal_error(format!("Failed to process payment: {}", e)))
        }
    }
}

async fn get_payment_by_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<PaymentResponseBody>, (StatusCode, Json<ErrorResponse>)> {
    match state.commands.get_payment_by_booking(booking_id).await {
        Ok(Some(payment)) => Ok(Json(PaymentResponseBody {
            payment_id: payment.id,
            booking_id: payment.booking_id,
            user_id: payment.user_id,
            amount: payment.amount,
            currency: payment.currency,
            payment_method: payment.payment_method.to_string(),
            status: payment.status.to_string(),
            transaction_id: payment.transaction_id,
        })),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("no payment for booking {}", booking_id),
            }),
        )),
        Err(e) => {
            tracing::error!("Failed to load payment: {}", e);
            Err(internal_error(format!("Failed to load payment: {}", e)))
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

fn internal_error(message: String) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: message }))
}
