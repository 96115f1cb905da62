//! Shared fixtures: in-memory store, in-process cache and a manual clock behind the real
//! services and router.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use time::OffsetDateTime;
use time::macros::datetime;

use taskmaster::application::dashboard::DashboardService;
use taskmaster::application::projects::ProjectService;
use taskmaster::application::tasks::{CreateTaskCommand, TaskService, UpdateTaskCommand};
use taskmaster::cache::{CacheConfig, CacheError, CacheLayer, CacheStore, MemoryCacheStore};
use taskmaster::domain::entities::TaskRecord;
use taskmaster::domain::types::{TaskPriority, TaskStatus};
use taskmaster::infra::http::{HttpState, build_router};
use taskmaster::infra::memory::InMemoryRepositories;
use taskmaster::util::clock::{Clock, ManualClock};

pub const NOW: OffsetDateTime = datetime!(2026-09-14 09:00 UTC);

pub struct TestApp {
    pub tasks: Arc<TaskService>,
    pub projects: Arc<ProjectService>,
    pub dashboard: Arc<DashboardService>,
    pub repos: Arc<InMemoryRepositories>,
    pub clock: ManualClock,
    pub router: Router,
}

/// Services wired to an in-process cache whose expiry follows the manual clock.
pub fn app() -> (TestApp, Arc<MemoryCacheStore>) {
    let clock = ManualClock::new(NOW);
    let store = Arc::new(MemoryCacheStore::new(Arc::new(clock.clone())));
    let shared: Arc<dyn CacheStore> = store.clone();
    (app_with(clock, Some(shared)), store)
}

/// Services wired to a cache store that fails every command.
pub fn app_with_offline_cache() -> TestApp {
    app_with(ManualClock::new(NOW), Some(Arc::new(OfflineCacheStore)))
}

pub fn app_with(clock: ManualClock, store: Option<Arc<dyn CacheStore>>) -> TestApp {
    let clock_dyn: Arc<dyn Clock> = Arc::new(clock.clone());
    let cache = store.map(|store| Arc::new(CacheLayer::new(store, CacheConfig::default())));

    let repos = Arc::new(InMemoryRepositories::new());
    for (name, color) in [("Personal", "#10B981"), ("Work", "#3B82F6"), ("Learning", "#8B5CF6")] {
        repos.put_project(name, color, false, NOW);
    }

    let tasks = Arc::new(
        TaskService::new(repos.clone(), repos.clone(), repos.clone(), clock_dyn.clone())
            .with_cache_opt(cache.clone()),
    );
    let projects = Arc::new(
        ProjectService::new(repos.clone(), repos.clone(), repos.clone(), clock_dyn.clone())
            .with_cache_opt(cache.clone()),
    );
    let dashboard =
        Arc::new(DashboardService::new(repos.clone(), clock_dyn).with_cache_opt(cache));

    let router = build_router(HttpState {
        tasks: tasks.clone(),
        projects: projects.clone(),
        dashboard: dashboard.clone(),
        health: repos.clone(),
    });

    TestApp {
        tasks,
        projects,
        dashboard,
        repos,
        clock,
        router,
    }
}

pub fn new_task(
    title: &str,
    priority: TaskPriority,
    project_id: i32,
    due_date: Option<OffsetDateTime>,
) -> CreateTaskCommand {
    CreateTaskCommand {
        title: title.to_string(),
        description: None,
        priority: Some(priority),
        status: None,
        due_date,
        assigned_to: None,
        tags: Vec::new(),
        project_id,
    }
}

pub fn with_status(task: &TaskRecord, status: TaskStatus) -> UpdateTaskCommand {
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

/// Cache store whose server is permanently unreachable.
pub struct OfflineCacheStore;

#[async_trait]
impl CacheStore for OfflineCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Err(CacheError::connection("connection refused"))
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::connection("connection refused"))
    }

    async fn delete(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::connection("connection refused"))
    }

    fn keys_matching(&self, _pattern: &str) -> BoxStream<'static, Result<String, CacheError>> {
        stream::once(async { Err(CacheError::connection("connection refused")) }).boxed()
    }
}
