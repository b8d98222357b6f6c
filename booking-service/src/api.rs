use crate::handlers::{BookingCommands, CreateBooking};
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
    pub commands: Arc<BookingCommands>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub flight_id: Uuid,
    pub user_id: Uuid,
    pub passenger_name: String,
    pub passenger_email: String,
    #[serde(default)]
    pub passenger_phone: String,
    pub number_of_seats: i32,
    pub total_amount: f64,
}

#[derive(Debug, Serialize)]
pub struct CreateBookingResponseBody {
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct BookingResponseBody {
    pub booking_id: Uuid,
    pub flight_id: Uuid,
    pub user_id: Uuid,
    pub passenger_name: String,
    pub passenger_email: String,
    pub number_of_seats: i32,
    pub total_amount: BigDecimal,
    pub status: String,
    pub booking_reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/by-user/:user_id", get(get_bookings_by_user))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

async fn create_booking(
    State(state): State<AppState>,
    Json(request): Json<CreateBookingRequest>,
) -> Result<Json<CreateBookingResponseBody>, (StatusCode, Json<ErrorResponse>)> {
    let total_amount = BigDecimal::try_from(request.total_amount)
        .map_err(|e| internal_error(format!("invalid amount: {}", e)))?;

    let command = CreateBooking {
        flight_id: request.flight_id,
        user_id: request.user_id,
        passenger_name: request.passenger_name,
        passenger_email: request.passenger_email,
        passenger_phone: request.passenger_phone,
        number_of_seats: request.number_of_seats,
        total_amount,
    };

    match state.commands.create_booking(command).await {
        Ok(response) => Ok(Json(CreateBookingResponseBody {
            booking_id: response.booking_id,
            booking_reference: response.booking_reference,
            status: response.status.to_string(),
        })),
        Err(e) => {
            tracing::error!("Failed to create booking: {}", e);
            Err(internal_error(format!("Failed to create booking: {}", e)))
        }
    }
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponseBody>, (StatusCode, Json<ErrorResponse>)> {
    match state.commands.get_booking(id).await {
        Ok(Some(booking)) => Ok(Json(booking_body(booking))),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("booking {} not found", id),
            }),
        )),
        Err(e) => {
            tracing::error!("Failed to load booking: {}", e);
            Err(internal_error(format!("Failed to load booking: {}", e)))
        }
    }
}

async fn get_bookings_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<BookingResponseBody>>, (StatusCode, Json<ErrorResponse>)> {
    match state.commands.get_bookings_by_user(user_id).await {
        Ok(bookings) => Ok(Json(bookings.into_iter().map(booking_body).collect())),
        Err(e) => {
            tracing::error!("Failed to load bookings: {}", e);
            Err(internal_error(format!("Failed to load bookings: {}", e)))
        }
    }
}

fn booking_body(booking: crate::models::Booking) -> BookingResponseBody {
    BookingResponseBody {
        booking_id: booking.id,
        flight_id: booking.flight_id,
        user_id: booking.user_id,
        passenger_name: booking.passenger_name,
        passenger_email: booking.passenger_email,
        number_of_seats: booking.number_of_seats,
        total_amount: booking.total_amount,
        status: booking.status.to_string(),
        booking_reference: booking.booking_reference,
    }
}

async fn health_check() -> &'static str {
    "OK"
}

fn internal_error(message: String) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: message }))
}
