//! User profile endpoints. Registration is open (it mirrors the auth
//! provider's sign-up); everything else needs identity headers.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::info;

use shared::{CreateUserRequest, UpdateUserRequest, UserListResponse};

use crate::domain::commands::users::{CreateUserCommand, UpdateUserCommand};
use crate::io::rest::{actor_from_headers, mappers};
use crate::Backend;

pub async fn create_user(
    State(backend): State<Backend>,
    Json(request): Json<CreateUserRequest>,
) -> impl IntoResponse {
    info!("POST /api/users - role {}", request.role);

    let command = CreateUserCommand {
        email: request.email,
        role: request.role,
        full_name: request.full_name,
        phone: request.phone,
    };
    match backend.user_service.create_user(command).await {
        Ok(result) => {
            (StatusCode::CREATED, Json(mappers::user_to_dto(&result.user))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn get_user(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/users/{}", user_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.user_service.get_user(&actor, &user_id).await {
        Ok(user) => (StatusCode::OK, Json(mappers::user_to_dto(&user))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_users(State(backend): State<Backend>, headers: HeaderMap) -> impl IntoResponse {
    info!("GET /api/users");

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.user_service.list_users(&actor).await {
        Ok(result) => {
            let response = UserListResponse {
                users: result.users.iter().map(mappers::user_to_dto).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn update_user(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> impl IntoResponse {
    info!("PUT /api/users/{}", user_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    let command = UpdateUserCommand {
        user_id,
        email: request.email,
        full_name: request.full_name,
        phone: request.phone,
    };
    match backend.user_service.update_user(&actor, command).await {
        Ok(result) => (StatusCode::OK, Json(mappers::user_to_dto(&result.user))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn deactivate_user(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/users/{}", user_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.user_service.deactivate_user(&actor, &user_id).await {
        Ok(result) => (StatusCode::OK, Json(mappers::user_to_dto(&result.user))).into_response(),
        Err(e) => e.into_response(),
    }
}
