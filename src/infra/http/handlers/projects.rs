use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;

use crate::infra::http::error::ApiError;
use crate::infra::http::models::{ProjectCreateRequest, ProjectListQuery};
use crate::infra::http::state::HttpState;

pub async fn list_projects(
    State(state): State<HttpState>,
    Query(query): Query<ProjectListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let projects = state.projects.list_projects(query.include_archived).await?;
    Ok(Json(projects))
}

pub async fn get_project(
    State(state): State<HttpState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    match state.projects.get_project(id).await? {
        Some(project) => Ok(Json(project)),
        None => Err(ApiError::not_found("project not found")),
    }
}

pub async fn create_project(
    State(state): State<HttpState>,
    Json(body): Json<ProjectCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let project = state.projects.create_project(body.into()).await?;
    let location = format!("/api/projects/{}", project.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(project)))
}

pub async fn delete_project(
    State(state): State<HttpState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if state.projects.delete_project(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("project not found"))
    }
}
