use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;

use crate::infra::http::error::ApiError;
use crate::infra::http::models::{TaskCreateRequest, TaskListQuery, TaskUpdateRequest};
use crate::infra::http::state::HttpState;

use super::cache_header;

pub async fn list_tasks(
    State(state): State<HttpState>,
    Query(query): Query<TaskListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.into_filter()?;
    let tasks = state.tasks.list_tasks(filter).await?;
    Ok((cache_header(tasks.status), Json(tasks.value)))
}

pub async fn get_task(
    State(state): State<HttpState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ApiError> {
    match state.tasks.get_task(id).await? {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::not_found("task not found")),
    }
}

pub async fn create_task(
    State(state): State<HttpState>,
    Json(body): Json<TaskCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state.tasks.create_task(body.into()).await?;
    let location = format!("/api/tasks/{}", task.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(task)))
}

pub async fn update_task(
    State(state): State<HttpState>,
    Path(id): Path<i32>,
    Json(body): Json<TaskUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match state.tasks.update_task(id, body.into()).await? {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::not_found("task not found")),
    }
}

pub async fn delete_task(
    State(state): State<HttpState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    if state.tasks.delete_task(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("task not found"))
    }
}
