//! Demo projects and tasks for a fresh store.

use std::sync::Arc;

use time::Duration;
use tracing::info;

use crate::application::error::ServiceError;
use crate::application::repos::{
    CreateProjectParams, CreateTaskParams, ProjectsRepo, ProjectsWriteRepo, TasksWriteRepo,
};
use crate::application::tasks::invalidate_task_lists;
use crate::cache::CacheLayer;
use crate::domain::types::{TaskPriority, TaskStatus};
use crate::util::clock::Clock;

struct SeedProject {
    name: &'static str,
    description: &'static str,
    color: &'static str,
}

struct SeedTask {
    title: &'static str,
    description: Option<&'static str>,
    priority: TaskPriority,
    status: TaskStatus,
    /// Index into `PROJECTS`.
    project: usize,
    created_days_ago: i64,
    due_in_days: Option<i64>,
    completed_days_ago: Option<i64>,
}

const PROJECTS: [SeedProject; 3] = [
    SeedProject {
        name: "Personal",
        description: "Personal tasks and reminders",
        color: "#10B981",
    },
    SeedProject {
        name: "Work",
        description: "Work-related tasks",
        color: "#3B82F6",
    },
    SeedProject {
        name: "Learning",
        description: "Learning and development",
        color: "#8B5CF6",
    },
];

const TASKS: [SeedTask; 5] = [
    SeedTask {
        title: "Set up development environment",
        description: Some("Install necessary tools and dependencies"),
        priority: TaskPriority::High,
        status: TaskStatus::Done,
        project: 1,
        created_days_ago: 7,
        due_in_days: None,
        completed_days_ago: Some(5),
    },
    SeedTask {
        title: "Learn distributed tracing",
        description: Some("Work through the collector and exporter guides"),
        priority: TaskPriority::High,
        status: TaskStatus::InProgress,
        project: 2,
        created_days_ago: 3,
        due_in_days: Some(7),
        completed_days_ago: None,
    },
    SeedTask {
        title: "Build demo application",
        description: Some("Create a distributed app with Redis and PostgreSQL"),
        priority: TaskPriority::Critical,
        status: TaskStatus::Todo,
        project: 1,
        created_days_ago: 0,
        due_in_days: Some(3),
        completed_days_ago: None,
    },
    SeedTask {
        title: "Grocery shopping",
        description: Some("Buy essentials for the week"),
        priority: TaskPriority::Medium,
        status: TaskStatus::Todo,
        project: 0,
        created_days_ago: 0,
        due_in_days: Some(1),
        completed_days_ago: None,
    },
    SeedTask {
        title: "Read Kubernetes documentation",
        description: None,
        priority: TaskPriority::Low,
        status: TaskStatus::Todo,
        project: 2,
        created_days_ago: 1,
        due_in_days: None,
        completed_days_ago: None,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub projects: usize,
    pub tasks: usize,
}

pub struct Seeder {
    projects_read: Arc<dyn ProjectsRepo>,
    projects_write: Arc<dyn ProjectsWriteRepo>,
    tasks_write: Arc<dyn TasksWriteRepo>,
    clock: Arc<dyn Clock>,
    cache: Option<Arc<CacheLayer>>,
}

impl Seeder {
    pub fn new(
        projects_read: Arc<dyn ProjectsRepo>,
        projects_write: Arc<dyn ProjectsWriteRepo>,
        tasks_write: Arc<dyn TasksWriteRepo>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            projects_read,
            projects_write,
            tasks_write,
            clock,
            cache: None,
        }
    }

    pub fn with_cache_opt(mut self, cache: Option<Arc<CacheLayer>>) -> Self {
        self.cache = cache;
        self
    }

    /// Insert the demo data unless any project already exists. Dates are relative to now.
    pub async fn seed_if_empty(&self) -> Result<Option<SeedReport>, ServiceError> {
        if !self.projects_read.find_projects(true).await?.is_empty() {
            info!("store already contains projects; skipping seed");
            return Ok(None);
        }

        let now = self.clock.now();
        let mut project_ids = Vec::with_capacity(PROJECTS.len());
        for project in &PROJECTS {
            let record = self
                .projects_write
                .insert_project(CreateProjectParams {
                    name: project.name.to_string(),
                    description: Some(project.description.to_string()),
                    color: project.color.to_string(),
                    is_archived: false,
                    created_at: now,
                })
                .await?;
            project_ids.push(record.id);
        }

        for task in &TASKS {
            let project_id = project_ids.get(task.project).copied().ok_or_else(|| {
                ServiceError::validation(format!("seed project index {} is out of range", task.project))
            })?;
            self.tasks_write
                .insert_task(CreateTaskParams {
                    title: task.title.to_string(),
                    description: task.description.map(str::to_string),
                    priority: task.priority,
                    status: task.status,
                    due_date: task.due_in_days.map(|days| now + Duration::days(days)),
                    assigned_to: None,
                    tags: Vec::new(),
                    project_id,
                    created_at: now - Duration::days(task.created_days_ago),
                    completed_at: task.completed_days_ago.map(|days| now - Duration::days(days)),
                })
                .await?;
        }

        invalidate_task_lists(self.cache.as_deref(), "seed").await;

        let report = SeedReport {
            projects: PROJECTS.len(),
            tasks: TASKS.len(),
        };
        info!(projects = report.projects, tasks = report.tasks, "seeded demo data");
        Ok(Some(report))
    }
}
