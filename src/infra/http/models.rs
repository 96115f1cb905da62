use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::application::projects::CreateProjectCommand;
use crate::application::repos::TaskQueryFilter;
use crate::application::tasks::{CreateTaskCommand, UpdateTaskCommand};
use crate::domain::types::{TaskPriority, TaskStatus};

use super::error::ApiError;

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub project_id: i32,
}

impl From<TaskCreateRequest> for CreateTaskCommand {
    fn from(request: TaskCreateRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            priority: request.priority,
            status: request.status,
            due_date: request.due_date,
            assigned_to: request.assigned_to,
            tags: request.tags,
            project_id: request.project_id,
        }
    }
}

/// Full replacement body. Omitted enum fields fall back to their defaults; `projectId` is
/// accepted for symmetry with the create body but ignored.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub project_id: Option<i32>,
}

impl From<TaskUpdateRequest> for UpdateTaskCommand {
    fn from(request: TaskUpdateRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            priority: request.priority,
            status: request.status,
            due_date: request.due_date,
            assigned_to: request.assigned_to,
            tags: request.tags,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
}

impl From<ProjectCreateRequest> for CreateProjectCommand {
    fn from(request: ProjectCreateRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            color: request.color,
            is_archived: request.is_archived,
        }
    }
}

/// Raw listing query. Empty values mean "no filter".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub project_id: Option<String>,
}

impl TaskListQuery {
    pub fn into_filter(self) -> Result<TaskQueryFilter, ApiError> {
        let status = non_empty(self.status)
            .map(|raw| raw.parse::<TaskStatus>())
            .transpose()
            .map_err(|err| ApiError::bad_request("Invalid status filter", Some(err.to_string())))?;
        let priority = non_empty(self.priority)
            .map(|raw| raw.parse::<TaskPriority>())
            .transpose()
            .map_err(|err| {
                ApiError::bad_request("Invalid priority filter", Some(err.to_string()))
            })?;
        let project_id = non_empty(self.project_id)
            .map(|raw| raw.trim().parse::<i32>())
            .transpose()
            .map_err(|err| {
                ApiError::bad_request("Invalid projectId filter", Some(err.to_string()))
            })?;

        Ok(TaskQueryFilter {
            status,
            priority,
            project_id,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListQuery {
    #[serde(default)]
    pub include_archived: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty())
}
