//! School directory endpoints.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use tracing::info;

use shared::{CreateSchoolRequest, SchoolListResponse, UpdateSchoolRequest};

use crate::domain::commands::schools::{CreateSchoolCommand, UpdateSchoolCommand};
use crate::io::rest::{actor_from_headers, mappers};
use crate::Backend;

pub async fn create_school(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Json(request): Json<CreateSchoolRequest>,
) -> impl IntoResponse {
    info!("POST /api/schools - {}", request.name);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    let command = CreateSchoolCommand {
        name: request.name,
        address: request.address,
        phone: request.phone,
        email: request.email,
        lunch_time_start: request.lunch_time_start,
        lunch_time_end: request.lunch_time_end,
    };
    match backend.school_service.create_school(&actor, command).await {
        Ok(result) => {
            (StatusCode::CREATED, Json(mappers::school_to_dto(&result.school))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn list_schools(State(backend): State<Backend>, headers: HeaderMap) -> impl IntoResponse {
    info!("GET /api/schools");

    if let Err(e) = actor_from_headers(&headers) {
        return e.into_response();
    }
    match backend.school_service.list_schools().await {
        Ok(result) => {
            let response = SchoolListResponse {
                schools: result.schools.iter().map(mappers::school_to_dto).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn get_school(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(school_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/schools/{}", school_id);

    if let Err(e) = actor_from_headers(&headers) {
        return e.into_response();
    }
    match backend.school_service.get_school(&school_id).await {
        Ok(school) => (StatusCode::OK, Json(mappers::school_to_dto(&school))).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn deactivate_school(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(school_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/schools/{}", school_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    match backend.school_service.deactivate_school(&actor, &school_id).await {
        Ok(result) => {
            (StatusCode::OK, Json(mappers::school_to_dto(&result.school))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn update_school(
    State(backend): State<Backend>,
    headers: HeaderMap,
    Path(school_id): Path<String>,
    Json(request): Json<UpdateSchoolRequest>,
) -> impl IntoResponse {
    info!("PUT /api/schools/{}", school_id);

    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(e) => return e.into_response(),
    };
    let command = UpdateSchoolCommand {
        school_id,
        name: request.name,
        address: request.address,
        phone: request.phone,
        email: request.email,
        lunch_time_start: request.lunch_time_start,
        lunch_time_end: request.lunch_time_end,
    };
    match backend.school_service.update_school(&actor, command).await {
        Ok(result) => {
            (StatusCode::OK, Json(mappers::school_to_dto(&result.school))).into_response()
        }
        Err(e) => e.into_response(),
    }
}
