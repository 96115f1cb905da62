//! In-memory repository implementation.
//!
//! Backs `serve` when no database URL is configured and drives the service tests. Ordering,
//! cascade and completion rules mirror the Postgres adapter so both can be exercised by the
//! same scenarios.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{
    CreateProjectParams, CreateTaskParams, ProjectsRepo, ProjectsWriteRepo, RepoError,
    StoreHealth, TaskCountPredicate, TaskGrouping, TaskQueryFilter, TasksRepo, TasksWriteRepo,
    UpdateTaskParams,
};
use crate::domain::entities::{ProjectRecord, ProjectSummary, TaskRecord};
use crate::domain::tasks::apply_completion;
use crate::domain::types::TaskStatus;
use crate::util::sync::{read_lock, write_lock};

const SOURCE: &str = "infra::memory";

#[derive(Default)]
struct MemoryState {
    projects: BTreeMap<i32, ProjectRecord>,
    tasks: BTreeMap<i32, TaskRecord>,
    next_project_id: i32,
    next_task_id: i32,
}

impl MemoryState {
    fn allocate_project_id(&mut self) -> i32 {
        self.next_project_id += 1;
        self.next_project_id
    }

    fn allocate_task_id(&mut self) -> i32 {
        self.next_task_id += 1;
        self.next_task_id
    }
}

#[derive(Default)]
pub struct InMemoryRepositories {
    state: RwLock<MemoryState>,
    task_reads: AtomicUsize,
    find_tasks_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a project directly, bypassing validation. Returns the stored record.
    pub fn put_project(
        &self,
        name: &str,
        color: &str,
        is_archived: bool,
        created_at: OffsetDateTime,
    ) -> ProjectRecord {
        let mut state = write_lock(&self.state, SOURCE, "put_project");
        let id = state.allocate_project_id();
        let project = ProjectRecord {
            id,
            name: name.to_string(),
            description: None,
            color: color.to_string(),
            created_at,
            is_archived,
        };
        state.projects.insert(id, project.clone());
        project
    }

    /// Current tasks ordered by id.
    pub fn snapshot_tasks(&self) -> Vec<TaskRecord> {
        read_lock(&self.state, SOURCE, "snapshot_tasks")
            .tasks
            .values()
            .cloned()
            .collect()
    }

    /// Number of `find_tasks` calls served so far.
    pub fn find_tasks_calls(&self) -> usize {
        self.find_tasks_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of task read queries of any kind served so far.
    pub fn task_reads(&self) -> usize {
        self.task_reads.load(AtomicOrdering::SeqCst)
    }

    /// Make every subsequent call fail with a persistence error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, AtomicOrdering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), RepoError> {
        if self.unavailable.load(AtomicOrdering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        Ok(())
    }

    fn begin_task_read(&self) -> Result<(), RepoError> {
        self.ensure_available()?;
        self.task_reads.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }
}

fn due_date_nulls_last(a: Option<OffsetDateTime>, b: Option<OffsetDateTime>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn listing_order(a: &TaskRecord, b: &TaskRecord) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| due_date_nulls_last(a.due_date, b.due_date))
        .then_with(|| a.id.cmp(&b.id))
}

fn completion_order(a: &TaskRecord, b: &TaskRecord) -> Ordering {
    let by_completion = match (a.completed_at, b.completed_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_completion.then_with(|| a.id.cmp(&b.id))
}

fn take_limit(mut tasks: Vec<TaskRecord>, limit: u32) -> Vec<TaskRecord> {
    tasks.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    tasks
}

#[async_trait]
impl TasksRepo for InMemoryRepositories {
    async fn find_tasks(&self, filter: &TaskQueryFilter) -> Result<Vec<TaskRecord>, RepoError> {
        self.begin_task_read()?;
        self.find_tasks_calls.fetch_add(1, AtomicOrdering::SeqCst);

        let state = read_lock(&self.state, SOURCE, "find_tasks");
        let mut tasks: Vec<TaskRecord> = state
            .tasks
            .values()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        tasks.sort_by(listing_order);
        Ok(tasks)
    }

    async fn find_task_by_id(&self, id: i32) -> Result<Option<TaskRecord>, RepoError> {
        self.begin_task_read()?;
        Ok(read_lock(&self.state, SOURCE, "find_task_by_id")
            .tasks
            .get(&id)
            .cloned())
    }

    async fn count_tasks(&self, predicate: TaskCountPredicate) -> Result<u64, RepoError> {
        self.begin_task_read()?;
        let state = read_lock(&self.state, SOURCE, "count_tasks");
        Ok(state
            .tasks
            .values()
            .filter(|task| predicate.matches(task))
            .count() as u64)
    }

    async fn group_count(&self, grouping: TaskGrouping) -> Result<Vec<(String, u64)>, RepoError> {
        self.begin_task_read()?;
        let state = read_lock(&self.state, SOURCE, "group_count");
        let mut counts: BTreeMap<&'static str, u64> = BTreeMap::new();
        for task in state.tasks.values() {
            let label = match grouping {
                TaskGrouping::Status => task.status.as_str(),
                TaskGrouping::Priority => task.priority.as_str(),
            };
            *counts.entry(label).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(label, count)| (label.to_string(), count))
            .collect())
    }

    async fn recently_completed(&self, limit: u32) -> Result<Vec<TaskRecord>, RepoError> {
        self.begin_task_read()?;
        let state = read_lock(&self.state, SOURCE, "recently_completed");
        let mut tasks: Vec<TaskRecord> = state
            .tasks
            .values()
            .filter(|task| task.status == TaskStatus::Done)
            .cloned()
            .collect();
        tasks.sort_by(completion_order);
        Ok(take_limit(tasks, limit))
    }

    async fn upcoming_deadlines(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<TaskRecord>, RepoError> {
        self.begin_task_read()?;
        let state = read_lock(&self.state, SOURCE, "upcoming_deadlines");
        let mut tasks: Vec<TaskRecord> = state
            .tasks
            .values()
            .filter(|task| {
                task.status != TaskStatus::Done && task.due_date.is_some_and(|due| due > now)
            })
            .cloned()
            .collect();
        tasks.sort_by(|a, b| {
            due_date_nulls_last(a.due_date, b.due_date).then_with(|| a.id.cmp(&b.id))
        });
        Ok(take_limit(tasks, limit))
    }
}

#[async_trait]
impl TasksWriteRepo for InMemoryRepositories {
    async fn insert_task(&self, params: CreateTaskParams) -> Result<TaskRecord, RepoError> {
        self.ensure_available()?;
        let mut state = write_lock(&self.state, SOURCE, "insert_task");
        if !state.projects.contains_key(&params.project_id) {
            return Err(RepoError::InvalidInput {
                message: format!("project `{}` does not exist", params.project_id),
            });
        }

        let id = state.allocate_task_id();
        let task = TaskRecord {
            id,
            title: params.title,
            description: params.description,
            priority: params.priority,
            status: params.status,
            created_at: params.created_at,
            due_date: params.due_date,
            completed_at: params.completed_at,
            assigned_to: params.assigned_to,
            tags: params.tags,
            project_id: params.project_id,
        };
        state.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        id: i32,
        params: UpdateTaskParams,
    ) -> Result<Option<TaskRecord>, RepoError> {
        self.ensure_available()?;
        let mut state = write_lock(&self.state, SOURCE, "update_task");
        let Some(task) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };

        task.title = params.title;
        task.description = params.description;
        task.priority = params.priority;
        task.status = params.status;
        task.due_date = params.due_date;
        task.assigned_to = params.assigned_to;
        task.tags = params.tags;
        task.completed_at = apply_completion(task.completed_at, params.completed_at_if_unset);

        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: i32) -> Result<bool, RepoError> {
        self.ensure_available()?;
        Ok(write_lock(&self.state, SOURCE, "delete_task")
            .tasks
            .remove(&id)
            .is_some())
    }
}

#[async_trait]
impl ProjectsRepo for InMemoryRepositories {
    async fn find_projects(&self, include_archived: bool) -> Result<Vec<ProjectSummary>, RepoError> {
        self.ensure_available()?;
        let state = read_lock(&self.state, SOURCE, "find_projects");
        Ok(state
            .projects
            .values()
            .filter(|project| include_archived || !project.is_archived)
            .map(|project| {
                let owned = state
                    .tasks
                    .values()
                    .filter(|task| task.project_id == project.id);
                let (task_count, completed_count) =
                    owned.fold((0u64, 0u64), |(total, done), task| {
                        (total + 1, done + u64::from(task.status == TaskStatus::Done))
                    });
                ProjectSummary {
                    project: project.clone(),
                    task_count,
                    completed_count,
                }
            })
            .collect())
    }

    async fn find_project_by_id(&self, id: i32) -> Result<Option<ProjectRecord>, RepoError> {
        self.ensure_available()?;
        Ok(read_lock(&self.state, SOURCE, "find_project_by_id")
            .projects
            .get(&id)
            .cloned())
    }
}

#[async_trait]
impl ProjectsWriteRepo for InMemoryRepositories {
    async fn insert_project(&self, params: CreateProjectParams) -> Result<ProjectRecord, RepoError> {
        self.ensure_available()?;
        let mut state = write_lock(&self.state, SOURCE, "insert_project");
        let id = state.allocate_project_id();
        let project = ProjectRecord {
            id,
            name: params.name,
            description: params.description,
            color: params.color,
            created_at: params.created_at,
            is_archived: params.is_archived,
        };
        state.projects.insert(id, project.clone());
        Ok(project)
    }

    async fn delete_project(&self, id: i32) -> Result<bool, RepoError> {
        self.ensure_available()?;
        let mut state = write_lock(&self.state, SOURCE, "delete_project");
        if state.projects.remove(&id).is_none() {
            return Ok(false);
        }
        state.tasks.retain(|_, task| task.project_id != id);
        Ok(true)
    }
}

#[async_trait]
impl StoreHealth for InMemoryRepositories {
    async fn ping(&self) -> Result<(), RepoError> {
        self.ensure_available()
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;
    use time::macros::datetime;

    use super::*;
    use crate::domain::types::TaskPriority;

    const NOW: OffsetDateTime = datetime!(2026-06-01 08:00 UTC);

    fn params(title: &str, priority: TaskPriority, due: Option<OffsetDateTime>) -> CreateTaskParams {
        CreateTaskParams {
            title: title.to_string(),
            description: None,
            priority,
            status: TaskStatus::Todo,
            due_date: due,
            assigned_to: None,
            tags: Vec::new(),
            project_id: 1,
            created_at: NOW,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn listing_orders_by_priority_then_due_date_with_undated_last() {
        let repos = InMemoryRepositories::new();
        repos.put_project("Work", "#3B82F6", false, NOW);
        let soon = Some(NOW + Duration::days(1));
        let later = Some(NOW + Duration::days(5));

        for (title, priority, due) in [
            ("low-soon", TaskPriority::Low, soon),
            ("high-undated", TaskPriority::High, None),
            ("high-later", TaskPriority::High, later),
            ("high-soon", TaskPriority::High, soon),
            ("critical-undated", TaskPriority::Critical, None),
        ] {
            repos
                .insert_task(params(title, priority, due))
                .await
                .expect("insert");
        }

        let titles: Vec<String> = repos
            .find_tasks(&TaskQueryFilter::default())
            .await
            .expect("list")
            .into_iter()
            .map(|task| task.title)
            .collect();
        assert_eq!(
            titles,
            vec![
                "critical-undated",
                "high-soon",
                "high-later",
                "high-undated",
                "low-soon"
            ]
        );
    }

    #[tokio::test]
    async fn insert_requires_existing_project() {
        let repos = InMemoryRepositories::new();
        let err = repos
            .insert_task(params("orphan", TaskPriority::Low, None))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn deleting_a_project_cascades_to_tasks() {
        let repos = InMemoryRepositories::new();
        repos.put_project("Work", "#3B82F6", false, NOW);
        let task = repos
            .insert_task(params("doomed", TaskPriority::Low, None))
            .await
            .expect("insert");

        assert!(repos.delete_project(1).await.expect("delete"));
        assert_eq!(repos.find_task_by_id(task.id).await.expect("find"), None);
        assert!(!repos.delete_project(1).await.expect("delete again"));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let repos = InMemoryRepositories::new();
        repos.set_unavailable(true);
        assert!(repos.ping().await.is_err());
        assert!(repos.find_tasks(&TaskQueryFilter::default()).await.is_err());
        assert_eq!(repos.find_tasks_calls(), 0);
    }
}
