//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{ProjectRecord, ProjectSummary, TaskRecord};
use crate::domain::types::{TaskPriority, TaskStatus};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Optional equality filters for task listings. Every supplied field must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TaskQueryFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub project_id: Option<i32>,
}

impl TaskQueryFilter {
    pub fn matches(&self, task: &TaskRecord) -> bool {
        self.status.is_none_or(|status| task.status == status)
            && self.priority.is_none_or(|priority| task.priority == priority)
            && self.project_id.is_none_or(|project| task.project_id == project)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCountPredicate {
    All,
    Status(TaskStatus),
    /// Due strictly before `now` and not Done.
    Overdue { now: OffsetDateTime },
}

impl TaskCountPredicate {
    pub fn matches(&self, task: &TaskRecord) -> bool {
        match self {
            Self::All => true,
            Self::Status(status) => task.status == *status,
            Self::Overdue { now } => {
                task.status != TaskStatus::Done && task.due_date.is_some_and(|due| due < *now)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskGrouping {
    Status,
    Priority,
}

#[derive(Debug, Clone)]
pub struct CreateTaskParams {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<OffsetDateTime>,
    pub assigned_to: Option<String>,
    pub tags: Vec<String>,
    pub project_id: i32,
    pub created_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
}

/// Full replacement of a task's editable fields. The owning project is not editable.
#[derive(Debug, Clone)]
pub struct UpdateTaskParams {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<OffsetDateTime>,
    pub assigned_to: Option<String>,
    pub tags: Vec<String>,
    /// Written to `completed_at` only when the stored value is still null.
    pub completed_at_if_unset: Option<OffsetDateTime>,
}

#[derive(Debug, Clone)]
pub struct CreateProjectParams {
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub is_archived: bool,
    pub created_at: OffsetDateTime,
}

#[async_trait]
pub trait TasksRepo: Send + Sync {
    /// Tasks matching `filter`, ordered by priority descending, due date ascending with
    /// undated tasks last, then id ascending.
    async fn find_tasks(&self, filter: &TaskQueryFilter) -> Result<Vec<TaskRecord>, RepoError>;

    async fn find_task_by_id(&self, id: i32) -> Result<Option<TaskRecord>, RepoError>;

    async fn count_tasks(&self, predicate: TaskCountPredicate) -> Result<u64, RepoError>;

    /// Counts per group label (`TaskStatus::as_str` / `TaskPriority::as_str`). Groups with no
    /// tasks may be omitted.
    async fn group_count(&self, grouping: TaskGrouping) -> Result<Vec<(String, u64)>, RepoError>;

    /// Done tasks by completion time descending (unset last), then id ascending.
    async fn recently_completed(&self, limit: u32) -> Result<Vec<TaskRecord>, RepoError>;

    /// Tasks due strictly after `now` that are not Done, by due date then id.
    async fn upcoming_deadlines(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<TaskRecord>, RepoError>;
}

#[async_trait]
pub trait TasksWriteRepo: Send + Sync {
    async fn insert_task(&self, params: CreateTaskParams) -> Result<TaskRecord, RepoError>;

    /// Returns `None` when no task has `id`.
    async fn update_task(
        &self,
        id: i32,
        params: UpdateTaskParams,
    ) -> Result<Option<TaskRecord>, RepoError>;

    /// Returns whether a task was removed.
    async fn delete_task(&self, id: i32) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait ProjectsRepo: Send + Sync {
    async fn find_projects(&self, include_archived: bool) -> Result<Vec<ProjectSummary>, RepoError>;

    async fn find_project_by_id(&self, id: i32) -> Result<Option<ProjectRecord>, RepoError>;
}

#[async_trait]
pub trait ProjectsWriteRepo: Send + Sync {
    async fn insert_project(&self, params: CreateProjectParams) -> Result<ProjectRecord, RepoError>;

    /// Removes the project and, by cascade, its tasks.
    async fn delete_project(&self, id: i32) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
