//! Payment endpoints (simulated gateway).

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::info;

use shared::{CreatePaymentRequest, PaymentListResponse};

use crate::domain::commands::payments::CreatePaymentCommand;
use crate::io::rest::{actor_from_headers, mappers};
use crate::Backend;

pub async fn create_payment(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(request): Json<CreatePaymentRequest>,
) -> impl IntoResponse {
    info!("POST /api/payments - amount {}", request.amount);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    let command = CreatePaymentCommand {
        booking_id: request.booking_id,
        amount: request.amount,
        currency: request.currency,
        payment_method: request.payment_method,
    };
    match backend.payment_service.create_payment(&actor, command).await {
        Ok(result) => {
            (StatusCode::CREATED, Json(mappers::payment_to_dto(&result.payment))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn list_payments(State(backend): State<Backend>, headers: HeaderMap) -> impl IntoResponse {
    info!("GET /api/payments");

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.payment_service.list_payments(&actor).await {
        Ok(result) => {
            let response = PaymentListResponse {
                payments: result.payments.iter().map(mappers::payment_to_dto).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn complete_payment(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(payment_id): Path<String>,
) -> impl IntoResponse {
    info!("POST /api/payments/{}/complete", payment_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.payment_service.complete_payment(&actor, &payment_id).await {
        Ok(result) => {
            (StatusCode::OK, Json(mappers::payment_to_dto(&result.payment))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn refund_payment(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(payment_id): Path<String>,
) -> impl IntoResponse {
    info!("POST /api/payments/{}/refund", payment_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.payment_service.refund_payment(&actor, &payment_id).await {
        Ok(result) => {
            (StatusCode::OK, Json(mappers::payment_to_dto(&result.payment))).into_response()
        }
        Err(e) => e.into_response(),
    }
}
