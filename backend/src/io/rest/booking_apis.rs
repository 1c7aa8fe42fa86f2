//! Booking endpoints.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::info;

use shared::{BookingListResponse, BookingResponse, CreateBookingRequest};

use crate::domain::commands::bookings::{CancelBookingCommand, CreateBookingCommand};
use crate::io::rest::{actor_from_headers, mappers};
use crate::Backend;

/// Create a booking; deliveries for every occurrence come back with it.
pub async fn create_booking(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(request): Json<CreateBookingRequest>,
) -> impl IntoResponse {
    info!("POST /api/bookings - child {}", request.child_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    let command = CreateBookingCommand {
        child_id: request.child_id,
        delivery_date: request.delivery_date,
        pickup_time: request.pickup_time,
        delivery_time: request.delivery_time,
        special_instructions: request.special_instructions,
        is_recurring: request.is_recurring,
        recurring_pattern: request.recurring_pattern,
        recurring_end_date: request.recurring_end_date,
    };

    match backend.booking_service.create_booking(&actor, command).await {
        Ok(result) => {
            let response = BookingResponse {
                booking: mappers::booking_to_dto(&result.booking),
                deliveries: result.deliveries.iter().map(mappers::delivery_to_dto).collect(),
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// List the calling parent's bookings.
pub async fn list_bookings(State(backend): State<Backend>, headers: HeaderMap) -> impl IntoResponse {
    info!("GET /api/bookings");

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.booking_service.list_bookings(&actor).await {
        Ok(result) => {
            let response = BookingListResponse {
                bookings: result.bookings.iter().map(mappers::booking_to_dto).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Fetch one booking with its deliveries.
pub async fn get_booking(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(booking_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/bookings/{}", booking_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.booking_service.get_booking(&actor, &booking_id).await {
        Ok(result) => {
            let response = BookingResponse {
                booking: mappers::booking_to_dto(&result.booking),
                deliveries: result.deliveries.iter().map(mappers::delivery_to_dto).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Admin acknowledgement of a fresh booking.
pub async fn confirm_booking(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(booking_id): Path<String>,
) -> impl IntoResponse {
    info!("POST /api/bookings/{}/confirm", booking_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.booking_service.confirm_booking(&actor, &booking_id).await {
        Ok(booking) => (StatusCode::OK, Json(mappers::booking_to_dto(&booking))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Cancel a booking. The response lists the deliveries failed by the
/// cancellation.
pub async fn cancel_booking(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(booking_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/bookings/{}", booking_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    let command = CancelBookingCommand { booking_id };
    match backend.booking_service.cancel_booking(&actor, command).await {
        Ok(result) => {
            let response = BookingResponse {
                booking: mappers::booking_to_dto(&result.booking),
                deliveries: result
                    .failed_deliveries
                    .iter()
                    .map(mappers::delivery_to_dto)
                    .collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}
