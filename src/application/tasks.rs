use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::application::error::ServiceError;
use crate::application::repos::{
    CreateTaskParams, ProjectsRepo, TaskQueryFilter, TasksRepo, TasksWriteRepo, UpdateTaskParams,
};
use crate::cache::{CacheKey, CacheLayer, Cached, InvalidationOutcome};
use crate::domain::entities::TaskRecord;
use crate::domain::error::DomainError;
use crate::domain::tasks::{
    ASSIGNEE_MAX_CHARS, DESCRIPTION_MAX_CHARS, TITLE_MAX_CHARS, completion_candidate,
    normalize_tags, optional_text, required_text,
};
use crate::domain::types::{TaskPriority, TaskStatus};
use crate::util::clock::Clock;

#[derive(Debug, Clone)]
pub struct CreateTaskCommand {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<OffsetDateTime>,
    pub assigned_to: Option<String>,
    pub tags: Vec<String>,
    pub project_id: i32,
}

#[derive(Debug, Clone)]
pub struct UpdateTaskCommand {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<OffsetDateTime>,
    pub assigned_to: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Clone)]
pub struct TaskService {
    reader: Arc<dyn TasksRepo>,
    writer: Arc<dyn TasksWriteRepo>,
    projects: Arc<dyn ProjectsRepo>,
    clock: Arc<dyn Clock>,
    cache: Option<Arc<CacheLayer>>,
}

impl TaskService {
    pub fn new(
        reader: Arc<dyn TasksRepo>,
        writer: Arc<dyn TasksWriteRepo>,
        projects: Arc<dyn ProjectsRepo>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reader,
            writer,
            projects,
            clock,
            cache: None,
        }
    }

    pub fn with_cache_opt(mut self, cache: Option<Arc<CacheLayer>>) -> Self {
        self.cache = cache;
        self
    }

    /// Filtered task listing served look-aside from the task list cache.
    pub async fn list_tasks(
        &self,
        filter: TaskQueryFilter,
    ) -> Result<Cached<Vec<TaskRecord>>, ServiceError> {
        let load = || async {
            self.reader
                .find_tasks(&filter)
                .await
                .map_err(ServiceError::from)
        };

        match self.cache.as_deref() {
            Some(cache) => {
                cache
                    .lookaside()
                    .get_or_load(
                        CacheKey::task_list(&filter),
                        cache.config().task_list_ttl,
                        load,
                    )
                    .await
            }
            None => load().await.map(Cached::bypass),
        }
    }

    pub async fn get_task(&self, id: i32) -> Result<Option<TaskRecord>, ServiceError> {
        Ok(self.reader.find_task_by_id(id).await?)
    }

    pub async fn create_task(&self, command: CreateTaskCommand) -> Result<TaskRecord, ServiceError> {
        let title = required_text(&command.title, "title", TITLE_MAX_CHARS)?;
        let description = optional_text(command.description, "description", DESCRIPTION_MAX_CHARS)?;
        let assigned_to = optional_text(command.assigned_to, "assignedTo", ASSIGNEE_MAX_CHARS)?;

        if self
            .projects
            .find_project_by_id(command.project_id)
            .await?
            .is_none()
        {
            return Err(DomainError::UnknownProject {
                id: command.project_id,
            }
            .into());
        }

        let now = self.clock.now();
        let status = command.status.unwrap_or_default();
        let params = CreateTaskParams {
            title,
            description,
            priority: command.priority.unwrap_or_default(),
            status,
            due_date: command.due_date,
            assigned_to,
            tags: normalize_tags(command.tags),
            project_id: command.project_id,
            created_at: now,
            completed_at: completion_candidate(status, now),
        };

        let task = self.writer.insert_task(params).await?;
        info!(task_id = task.id, project_id = task.project_id, "task created");

        invalidate_task_lists(self.cache.as_deref(), "create_task").await;
        Ok(task)
    }

    /// Replace a task's editable fields. `Ok(None)` when the task does not exist.
    pub async fn update_task(
        &self,
        id: i32,
        command: UpdateTaskCommand,
    ) -> Result<Option<TaskRecord>, ServiceError> {
        let title = required_text(&command.title, "title", TITLE_MAX_CHARS)?;
        let description = optional_text(command.description, "description", DESCRIPTION_MAX_CHARS)?;
        let assigned_to = optional_text(command.assigned_to, "assignedTo", ASSIGNEE_MAX_CHARS)?;

        let params = UpdateTaskParams {
            title,
            description,
            priority: command.priority,
            status: command.status,
            due_date: command.due_date,
            assigned_to,
            tags: normalize_tags(command.tags),
            completed_at_if_unset: completion_candidate(command.status, self.clock.now()),
        };

        let Some(task) = self.writer.update_task(id, params).await? else {
            return Ok(None);
        };
        info!(task_id = task.id, status = %task.status, "task updated");

        invalidate_task_lists(self.cache.as_deref(), "update_task").await;
        Ok(Some(task))
    }

    /// Returns whether the task existed.
    pub async fn delete_task(&self, id: i32) -> Result<bool, ServiceError> {
        if !self.writer.delete_task(id).await? {
            return Ok(false);
        }
        info!(task_id = id, "task deleted");

        invalidate_task_lists(self.cache.as_deref(), "delete_task").await;
        Ok(true)
    }
}

/// Purge every cached task list after a committed write. Failures are logged, never raised.
pub(crate) async fn invalidate_task_lists(
    cache: Option<&CacheLayer>,
    operation: &'static str,
) -> Option<InvalidationOutcome> {
    let cache = cache?;
    let outcome = cache.invalidator().invalidate_task_caches().await;
    if !outcome.is_clean() {
        warn!(
            operation,
            deleted = outcome.deleted,
            failures = outcome.failures,
            "task list cache invalidation incomplete; stale lists expire by TTL"
        );
    }
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use time::macros::datetime;

    use super::*;
    use crate::cache::{CacheConfig, CacheStatus, CacheStore, MemoryCacheStore};
    use crate::infra::memory::InMemoryRepositories;
    use crate::util::clock::ManualClock;

    struct Fixture {
        service: TaskService,
        repos: Arc<InMemoryRepositories>,
        store: Arc<MemoryCacheStore>,
        clock: ManualClock,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::new(datetime!(2026-04-10 12:00 UTC));
        let clock_dyn: Arc<dyn Clock> = Arc::new(clock.clone());
        let repos = Arc::new(InMemoryRepositories::new());
        repos.put_project("Work", "#3B82F6", false, clock.now());
        let store = Arc::new(MemoryCacheStore::new(clock_dyn.clone()));
        let cache = Arc::new(CacheLayer::new(store.clone(), CacheConfig::default()));
        let service = TaskService::new(repos.clone(), repos.clone(), repos.clone(), clock_dyn)
            .with_cache_opt(Some(cache));
        Fixture {
            service,
            repos,
            store,
            clock,
        }
    }

    fn create(title: &str, status: Option<TaskStatus>) -> CreateTaskCommand {
        CreateTaskCommand {
            title: title.to_string(),
            description: None,
            priority: None,
            status,
            due_date: None,
            assigned_to: None,
            tags: Vec::new(),
            project_id: 1,
        }
    }

    fn update_from(task: &TaskRecord, status: TaskStatus) -> UpdateTaskCommand {
        UpdateTaskCommand {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            status,
            due_date: task.due_date,
            assigned_to: task.assigned_to.clone(),
            tags: task.tags.clone(),
        }
    }

    #[tokio::test]
    async fn create_applies_defaults_and_rejects_unknown_project() {
        let fx = fixture();
        let task = fx
            .service
            .create_task(create("  Write report ", None))
            .await
            .expect("create");
        assert_eq!(task.title, "Write report");
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.created_at, fx.clock.now());
        assert_eq!(task.completed_at, None);

        let mut orphan = create("Orphan", None);
        orphan.project_id = 99;
        let err = fx.service.create_task(orphan).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::UnknownProject { id: 99 })
        ));
    }

    #[tokio::test]
    async fn create_as_done_stamps_completion() {
        let fx = fixture();
        let task = fx
            .service
            .create_task(create("Already finished", Some(TaskStatus::Done)))
            .await
            .expect("create");
        assert_eq!(task.completed_at, Some(fx.clock.now()));
    }

    #[tokio::test]
    async fn completion_timestamp_survives_repeated_done_updates() {
        let fx = fixture();
        let task = fx
            .service
            .create_task(create("Ship release", None))
            .await
            .expect("create");

        let first_done = fx.clock.now();
        let done = fx
            .service
            .update_task(task.id, update_from(&task, TaskStatus::Done))
            .await
            .expect("update")
            .expect("task exists");
        assert_eq!(done.completed_at, Some(first_done));

        fx.clock.advance(time::Duration::hours(3));
        let again = fx
            .service
            .update_task(task.id, update_from(&done, TaskStatus::Done))
            .await
            .expect("update")
            .expect("task exists");
        assert_eq!(again.completed_at, Some(first_done));
    }

    #[tokio::test]
    async fn missing_task_is_reported_without_invalidation() {
        let fx = fixture();
        fx.store
            .set("tasks:-:-:-", bytes::Bytes::from_static(b"[]"), Duration::from_secs(30))
            .await
            .expect("seed cache");

        let command = UpdateTaskCommand {
            title: "Ghost".into(),
            description: None,
            priority: TaskPriority::Low,
            status: TaskStatus::Todo,
            due_date: None,
            assigned_to: None,
            tags: Vec::new(),
        };
        assert_eq!(fx.service.update_task(404, command).await.expect("update"), None);
        assert!(!fx.service.delete_task(404).await.expect("delete"));
        assert_eq!(fx.store.live_keys(), vec!["tasks:-:-:-".to_string()]);
    }

    #[tokio::test]
    async fn writes_purge_cached_lists() {
        let fx = fixture();
        let first = fx.service.list_tasks(TaskQueryFilter::default()).await.expect("list");
        assert_eq!(first.status, CacheStatus::Miss);
        assert!(first.value.is_empty());

        fx.service
            .create_task(create("Fresh", None))
            .await
            .expect("create");
        assert!(fx.store.live_keys().is_empty());

        let after = fx.service.list_tasks(TaskQueryFilter::default()).await.expect("list");
        assert_eq!(after.status, CacheStatus::Miss);
        assert_eq!(after.value.len(), 1);
        assert_eq!(fx.repos.find_tasks_calls(), 2);
    }

    #[tokio::test]
    async fn over_long_title_is_rejected_before_the_store() {
        let fx = fixture();
        let err = fx
            .service
            .create_task(create(&"x".repeat(201), None))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("title"));
        assert!(fx.repos.snapshot_tasks().is_empty());
    }
}
