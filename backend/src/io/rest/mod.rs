//! REST interface layer.
//!
//! Handles request/response serialization, principal extraction, and the
//! translation of domain errors to HTTP status codes. No business logic
//! lives here.

pub mod booking_apis;
pub mod child_apis;
pub mod delivery_apis;
pub mod mappers;
pub mod payment_apis;
pub mod school_apis;
pub mod subscription_apis;
pub mod user_apis;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};

use shared::UserRole;

use crate::domain::errors::DomainError;
use crate::domain::models::Actor;
use crate::Backend;

/// Build the API router. Mounted under `/api` by the server binary.
pub fn api_router() -> Router<Backend> {
    Router::new()
        // Users
        .route("/users", post(user_apis::create_user).get(user_apis::list_users))
        .route(
            "/users/:user_id",
            get(user_apis::get_user)
                .put(user_apis::update_user)
                .delete(user_apis::deactivate_user),
        )
        // Schools
        .route("/schools", post(school_apis::create_school).get(school_apis::list_schools))
        .route(
            "/schools/:school_id",
            get(school_apis::get_school)
                .put(school_apis::update_school)
                .delete(school_apis::deactivate_school),
        )
        .route(
            "/schools/:school_id/deliveries",
            get(delivery_apis::list_for_school),
        )
        // Children
        .route("/children", post(child_apis::create_child).get(child_apis::list_children))
        .route(
            "/children/:child_id",
            get(child_apis::get_child)
                .put(child_apis::update_child)
                .delete(child_apis::deactivate_child),
        )
        // Bookings
        .route(
            "/bookings",
            post(booking_apis::create_booking).get(booking_apis::list_bookings),
        )
        .route(
            "/bookings/:booking_id",
            get(booking_apis::get_booking).delete(booking_apis::cancel_booking),
        )
        .route("/bookings/:booking_id/confirm", post(booking_apis::confirm_booking))
        // Deliveries
        .route("/deliveries/qr/:qr_code", get(delivery_apis::scan))
        .route("/deliveries/qr/:qr_code/status", post(delivery_apis::update_status))
        .route(
            "/deliveries/qr/:qr_code/report-missing",
            post(delivery_apis::report_missing),
        )
        .route("/deliveries/:delivery_id/assign", put(delivery_apis::assign_staff))
        .route("/deliveries/route", get(delivery_apis::plan_route))
        // Payments
        .route(
            "/payments",
            post(payment_apis::create_payment).get(payment_apis::list_payments),
        )
        .route("/payments/:payment_id/complete", post(payment_apis::complete_payment))
        .route("/payments/:payment_id/refund", post(payment_apis::refund_payment))
        // Subscriptions
        .route(
            "/subscriptions",
            post(subscription_apis::create_subscription).get(subscription_apis::list_subscriptions),
        )
        .route(
            "/subscriptions/:subscription_id",
            delete(subscription_apis::cancel_subscription),
        )
}

/// Resolve the acting principal from the identity headers the auth proxy
/// injects (`X-User-Id`, `X-User-Role`).
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, DomainError> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DomainError::validation("missing X-User-Id header"))?;
    let role_raw = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| DomainError::validation("missing X-User-Role header"))?;
    let role = UserRole::parse(role_raw)
        .ok_or_else(|| DomainError::validation(format!("unknown role: '{}'", role_raw)))?;
    Ok(Actor::new(user_id, role))
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let status = match &self {
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            DomainError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Storage errors can carry file paths; don't leak them to clients.
        let body = match &self {
            DomainError::Storage(_) => "internal storage error".to_string(),
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn actor_is_read_from_identity_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("user::p1"));
        headers.insert("x-user-role", HeaderValue::from_static("parent"));

        let actor = actor_from_headers(&headers).unwrap();
        assert_eq!(actor.user_id, "user::p1");
        assert_eq!(actor.role, UserRole::Parent);
    }

    #[test]
    fn missing_or_unknown_identity_is_rejected() {
        let headers = HeaderMap::new();
        assert!(actor_from_headers(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("user::p1"));
        headers.insert("x-user-role", HeaderValue::from_static("superuser"));
        assert!(actor_from_headers(&headers).is_err());
    }

    #[test]
    fn domain_errors_map_to_expected_status_codes() {
        let cases: Vec<(DomainError, StatusCode)> = vec![
            (DomainError::validation("bad"), StatusCode::BAD_REQUEST),
            (DomainError::not_found("x"), StatusCode::NOT_FOUND),
            (
                DomainError::invalid_transition("assigned", "delivered"),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (DomainError::Conflict("race".into()), StatusCode::CONFLICT),
            (
                DomainError::Timeout(std::time::Duration::from_secs(5)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                DomainError::Storage(anyhow::anyhow!("disk on fire")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
