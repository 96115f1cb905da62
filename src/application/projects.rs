use std::sync::Arc;

use tracing::info;

use crate::application::error::ServiceError;
use crate::application::repos::{
    CreateProjectParams, ProjectsRepo, ProjectsWriteRepo, TaskQueryFilter, TasksRepo,
};
use crate::application::tasks::invalidate_task_lists;
use crate::cache::CacheLayer;
use crate::domain::entities::{ProjectRecord, ProjectSummary, ProjectWithTasks};
use crate::domain::projects::{project_color, project_description, project_name};
use crate::util::clock::Clock;

#[derive(Debug, Clone, Default)]
pub struct CreateProjectCommand {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_archived: bool,
}

#[derive(Clone)]
pub struct ProjectService {
    reader: Arc<dyn ProjectsRepo>,
    writer: Arc<dyn ProjectsWriteRepo>,
    tasks: Arc<dyn TasksRepo>,
    clock: Arc<dyn Clock>,
    cache: Option<Arc<CacheLayer>>,
}

impl ProjectService {
    pub fn new(
        reader: Arc<dyn ProjectsRepo>,
        writer: Arc<dyn ProjectsWriteRepo>,
        tasks: Arc<dyn TasksRepo>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reader,
            writer,
            tasks,
            clock,
            cache: None,
        }
    }

    pub fn with_cache_opt(mut self, cache: Option<Arc<CacheLayer>>) -> Self {
        self.cache = cache;
        self
    }

    pub async fn list_projects(
        &self,
        include_archived: bool,
    ) -> Result<Vec<ProjectSummary>, ServiceError> {
        Ok(self.reader.find_projects(include_archived).await?)
    }

    pub async fn get_project(&self, id: i32) -> Result<Option<ProjectWithTasks>, ServiceError> {
        let Some(project) = self.reader.find_project_by_id(id).await? else {
            return Ok(None);
        };
        let filter = TaskQueryFilter {
            project_id: Some(id),
            ..TaskQueryFilter::default()
        };
        let tasks = self.tasks.find_tasks(&filter).await?;
        Ok(Some(ProjectWithTasks { project, tasks }))
    }

    /// Task lists are unaffected by a new, empty project, so no invalidation runs.
    pub async fn create_project(
        &self,
        command: CreateProjectCommand,
    ) -> Result<ProjectRecord, ServiceError> {
        let params = CreateProjectParams {
            name: project_name(&command.name)?,
            description: project_description(command.description)?,
            color: project_color(command.color)?,
            is_archived: command.is_archived,
            created_at: self.clock.now(),
        };
        let project = self.writer.insert_project(params).await?;
        info!(project_id = project.id, "project created");
        Ok(project)
    }

    /// Delete a project and its tasks. Returns whether the project existed.
    pub async fn delete_project(&self, id: i32) -> Result<bool, ServiceError> {
        if !self.writer.delete_project(id).await? {
            return Ok(false);
        }
        info!(project_id = id, "project deleted with its tasks");

        invalidate_task_lists(self.cache.as_deref(), "delete_project").await;
        Ok(true)
    }
}
