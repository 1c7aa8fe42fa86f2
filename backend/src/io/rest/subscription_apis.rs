//! Meal-plan subscription endpoints.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::info;

use shared::{CreateSubscriptionRequest, SubscriptionListResponse};

use crate::domain::commands::subscriptions::CreateSubscriptionCommand;
use crate::io::rest::{actor_from_headers, mappers};
use crate::Backend;

pub async fn create_subscription(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(request): Json<CreateSubscriptionRequest>,
) -> impl IntoResponse {
    info!("POST /api/subscriptions - plan {}", request.plan_type);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    let command = CreateSubscriptionCommand {
        plan_type: request.plan_type,
        amount: request.amount,
        start_date: request.start_date,
        end_date: request.end_date,
    };
    match backend
        .subscription_service
        .create_subscription(&actor, command)
        .await
    {
        Ok(result) => (
            StatusCode::CREATED,
            Json(mappers::subscription_to_dto(&result.subscription)),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_subscriptions(
    State(backend): State<Backend>,
    headers: HeaderMap,
) -> impl IntoResponse {
    info!("GET /api/subscriptions");

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.subscription_service.list_subscriptions(&actor).await {
        Ok(result) => {
            let response = SubscriptionListResponse {
                subscriptions: result
                    .subscriptions
                    .iter()
                    .map(mappers::subscription_to_dto)
                    .collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn cancel_subscription(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(subscription_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/subscriptions/{}", subscription_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend
        .subscription_service
        .cancel_subscription(&actor, &subscription_id)
        .await
    {
        Ok(result) => (
            StatusCode::OK,
            Json(mappers::subscription_to_dto(&result.subscription)),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
