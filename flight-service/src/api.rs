use crate::handlers::{CreateFlight, FlightCommands};
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
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub commands: Arc<FlightCommands>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFlightRequest {
    pub flight_number: String,
    pub airline: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub total_seats: i32,
    pub price_per_seat: f64,
    #[serde(default)]
    pub aircraft_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct CreateFlightResponseBody {
    pub flight_id: Uuid,
    pub flight_number: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct FlightResponseBody {
    pub flight_id: Uuid,
    pub flight_number: String,
    pub airline: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub total_seats: i32,
    pub available_seats: i32,
    pub price_per_seat: BigDecimal,
    pub status: String,
    pub aircraft_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/flights", post(create_flight))
        .route("/flights/search", get(search_flights))
        .route("/flights/:id", get(get_flight))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

async fn create_flight(
    State(state): State<AppState>,
    Json(request): Json<CreateFlightRequest>,
) -> Result<Json<CreateFlightResponseBody>, (StatusCode, Json<ErrorResponse>)> {
    let price_per_seat = BigDecimal::try_from(request.price_per_seat)
        .map_err(|e| internal_error(format!("invalid price: {}", e)))?;

    let command = CreateFlight {
        flight_number: request.flight_number,
        airline: request.airline,
        departure_airport: request.departure_airport,
        arrival_airport: request.arrival_airport,
        departure_time: request.departure_time,
        arrival_time: request.arrival_time,
        total_seats: request.total_seats,
        price_per_seat,
        aircraft_type: request.aircraft_type,
    };

    match state.commands.create_flight(command).await {
        Ok(response) => Ok(Json(CreateFlightResponseBody {
            flight_id: response.flight_id,
            flight_number: response.flight_number,
            status: response.status.to_string(),
        })),
        Err(e) => {
            tracing::error!("Failed to create flight: {}", e);
            Err(internal_error(format!("Failed to create flight: {}", e)))
        }
    }
}

async fn search_flights(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<FlightResponseBody>>, (StatusCode, Json<ErrorResponse>)> {
    match state
        .commands
        .search_flights(
            &query.departure_airport,
            &query.arrival_airport,
            query.departure_date,
        )
        .await
    {
        Ok(flights) => Ok(Json(flights.into_iter().map(flight_body).collect())),
        Err(e) => {
            tracing::error!("Failed to search flights: {}", e);
            Err(internal_error(format!("Failed to search flights: {}", e)))
        }
    }
}

async fn get_flight(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FlightResponseBody>, (StatusCode, Json<ErrorResponse>)> {
    match state.commands.get_flight(id).await {
        Ok(Some(flight)) => Ok(Json(flight_body(flight))),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("flight {} not found", id),
            }),
        )),
        Err(e) => {
            tracing::error!("Failed to load flight: {}", e);
            Err(internal_error(format!("Failed to load flight: {}", e)))
        }
    }
}

fn flight_body(flight: crate::models::Flight) -> FlightResponseBody {
    FlightResponseBody {
        flight_id: flight.id,
        flight_number: flight.flight_number,
        airline: flight.airline,
        departure_airport: flight.departure_airport,
        arrival_airport: flight.arrival_airport,
        departure_time: flight.departure_time,
        arrival_time: flight.arrival_time,
        total_seats: flight.total_seats,
        available_seats: flight.available_seats,
        price_per_seat: flight.price_per_seat,
        status: flight.status.to_string(),
        aircraft_type: flight.aircraft_type,
    }
}

async fn health_check() -> &'static str {
    "OK"
}

fn internal_error(message: String) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: message }))
}
