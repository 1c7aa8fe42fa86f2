//! Child profile endpoints.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::info;

use shared::{ChildListResponse, CreateChildRequest, UpdateChildRequest};

use crate::domain::commands::children::{CreateChildCommand, UpdateChildCommand};
use crate::io::rest::{actor_from_headers, mappers};
use crate::Backend;

pub async fn create_child(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(request): Json<CreateChildRequest>,
) -> impl IntoResponse {
    info!("POST /api/children - school {}", request.school_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    let command = CreateChildCommand {
        school_id: request.school_id,
        name: request.name,
        class_name: request.class_name,
        allergies: request.allergies,
        special_notes: request.special_notes,
    };
    match backend.child_service.create_child(&actor, command).await {
        Ok(result) => {
            (StatusCode::CREATED, Json(mappers::child_to_dto(&result.child))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn list_children(State(backend): State<Backend>, headers: HeaderMap) -> impl IntoResponse {
    info!("GET /api/children");

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.child_service.list_children(&actor).await {
        Ok(result) => {
            let response = ChildListResponse {
                children: result.children.iter().map(mappers::child_to_dto).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn get_child(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(child_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/children/{}", child_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.child_service.get_child(&actor, &child_id).await {
        Ok(child) => (StatusCode::OK, Json(mappers::child_to_dto(&child))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_child(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(child_id): Path<String>,
    Json(request): Json<UpdateChildRequest>,
) -> impl IntoResponse {
    info!("PUT /api/children/{}", child_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    let command = UpdateChildCommand {
        child_id,
        name: request.name,
        class_name: request.class_name,
        allergies: request.allergies,
        special_notes: request.special_notes,
    };
    match backend.child_service.update_child(&actor, command).await {
        Ok(result) => (StatusCode::OK, Json(mappers::child_to_dto(&result.child))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn deactivate_child(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(child_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/children/{}", child_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.child_service.deactivate_child(&actor, &child_id).await {
        Ok(result) => (StatusCode::OK, Json(mappers::child_to_dto(&result.child))).into_response(),
        Err(e) => e.into_response(),
    }
}
