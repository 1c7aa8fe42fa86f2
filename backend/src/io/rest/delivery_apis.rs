//! Delivery endpoints: scan resolution, lifecycle transitions, staff
//! assignment, and route planning.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::info;

use shared::{
    AssignStaffRequest, DeliveryListResponse, ScanResponse, UpdateDeliveryStatusRequest,
};

use crate::domain::commands::deliveries::{ApplyTransitionCommand, AssignStaffCommand};
use crate::io::rest::{actor_from_headers, mappers};
use crate::Backend;

/// Resolve a tracking code to its delivery and booking.
pub async fn scan(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(qr_code): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/deliveries/qr/<code>");

    if let Err(e) = actor_from_headers(&headers) {
        return e.into_response();
    }
    match backend.delivery_service.scan(&qr_code).await {
        Ok(result) => {
            let response = ScanResponse {
                delivery: mappers::delivery_to_dto(&result.delivery),
                booking: mappers::booking_to_dto(&result.booking),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Apply a lifecycle transition to the delivery behind a tracking code.
pub async fn update_status(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(qr_code): Path<String>,
    Json(request): Json<UpdateDeliveryStatusRequest>,
) -> impl IntoResponse {
    info!("POST /api/deliveries/qr/<code>/status -> {}", request.status);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    let command = ApplyTransitionCommand {
        qr_code,
        requested_status: request.status,
    };
    match backend.delivery_service.apply_transition(&actor, command).await {
        Ok(result) => {
            let response = ScanResponse {
                delivery: mappers::delivery_to_dto(&result.delivery),
                booking: mappers::booking_to_dto(&result.booking),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// School-side report that a lunchbox never arrived.
pub async fn report_missing(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(qr_code): Path<String>,
) -> impl IntoResponse {
    info!("POST /api/deliveries/qr/<code>/report-missing");

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.delivery_service.report_missing(&actor, &qr_code).await {
        Ok(result) => {
            let response = ScanResponse {
                delivery: mappers::delivery_to_dto(&result.delivery),
                booking: mappers::booking_to_dto(&result.booking),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Attach a staff member to a delivery awaiting pickup.
pub async fn assign_staff(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(delivery_id): Path<String>,
    Json(request): Json<AssignStaffRequest>,
) -> impl IntoResponse {
    info!("PUT /api/deliveries/{}/assign -> {}", delivery_id, request.staff_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    let command = AssignStaffCommand {
        delivery_id,
        staff_id: request.staff_id,
    };
    match backend.delivery_service.assign_staff(&actor, command).await {
        Ok(result) => {
            (StatusCode::OK, Json(mappers::delivery_to_dto(&result.delivery))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct RouteQuery {
    pub staff_id: String,
    /// Day to plan for (YYYY-MM-DD)
    pub date: String,
}

/// A staff member's deliveries for one day, ordered by school name.
pub async fn plan_route(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Query(query): Query<RouteQuery>,
) -> impl IntoResponse {
    info!("GET /api/deliveries/route?staff_id={}&date={}", query.staff_id, query.date);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend
        .delivery_service
        .plan_route(&actor, &query.staff_id, &query.date)
        .await
    {
        Ok(result) => {
            let response = DeliveryListResponse {
                deliveries: result.deliveries.iter().map(mappers::delivery_to_dto).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct SchoolDayQuery {
    /// Day to list (YYYY-MM-DD)
    pub date: String,
}

/// Deliveries arriving at a school on one day.
pub async fn list_for_school(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(school_id): Path<String>,
    Query(query): Query<SchoolDayQuery>,
) -> impl IntoResponse {
    info!("GET /api/schools/{}/deliveries?date={}", school_id, query.date);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend
        .delivery_service
        .list_for_school(&actor, &school_id, &query.date)
        .await
    {
        Ok(result) => {
            let response = DeliveryListResponse {
                deliveries: result.deliveries.iter().map(mappers::delivery_to_dto).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}
