//! Dashboard aggregates computed from one consistent `now` and cached as a single snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;

use crate::application::error::ServiceError;
use crate::application::repos::{TaskCountPredicate, TaskGrouping, TasksRepo};
use crate::cache::{CacheKey, CacheLayer, Cached};
use crate::domain::entities::TaskRecord;
use crate::domain::types::{TaskPriority, TaskStatus};
use crate::util::clock::Clock;

const RECENTLY_COMPLETED_LIMIT: u32 = 5;
const UPCOMING_DEADLINES_LIMIT: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub in_progress_tasks: u64,
    pub overdue_tasks: u64,
    /// One entry per priority, in ascending priority order.
    pub tasks_by_priority: Vec<PriorityCount>,
    /// One entry per status, in workflow order.
    pub tasks_by_status: Vec<StatusCount>,
    pub recently_completed: Vec<CompletedTaskSummary>,
    pub upcoming_deadlines: Vec<DeadlineSummary>,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCount {
    pub priority: TaskPriority,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: TaskStatus,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTaskSummary {
    pub id: i32,
    pub title: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadlineSummary {
    pub id: i32,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub due_date: OffsetDateTime,
    pub priority: TaskPriority,
}

#[derive(Clone)]
pub struct DashboardService {
    tasks: Arc<dyn TasksRepo>,
    clock: Arc<dyn Clock>,
    cache: Option<Arc<CacheLayer>>,
}

impl DashboardService {
    pub fn new(tasks: Arc<dyn TasksRepo>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks,
            clock,
            cache: None,
        }
    }

    pub fn with_cache_opt(mut self, cache: Option<Arc<CacheLayer>>) -> Self {
        self.cache = cache;
        self
    }

    /// Cached snapshot, recomputed only once the dashboard TTL has elapsed.
    pub async fn get_dashboard_stats(&self) -> Result<Cached<DashboardStats>, ServiceError> {
        match self.cache.as_deref() {
            Some(cache) => {
                cache
                    .lookaside()
                    .get_or_load(CacheKey::DashboardStats, cache.config().dashboard_ttl, || {
                        self.compute()
                    })
                    .await
            }
            None => self.compute().await.map(Cached::bypass),
        }
    }

    async fn compute(&self) -> Result<DashboardStats, ServiceError> {
        let now = self.clock.now();
        let tasks = &self.tasks;

        let (
            total_tasks,
            completed_tasks,
            in_progress_tasks,
            overdue_tasks,
            by_priority,
            by_status,
            recently_completed,
            upcoming_deadlines,
        ) = tokio::try_join!(
            tasks.count_tasks(TaskCountPredicate::All),
            tasks.count_tasks(TaskCountPredicate::Status(TaskStatus::Done)),
            tasks.count_tasks(TaskCountPredicate::Status(TaskStatus::InProgress)),
            tasks.count_tasks(TaskCountPredicate::Overdue { now }),
            tasks.group_count(TaskGrouping::Priority),
            tasks.group_count(TaskGrouping::Status),
            tasks.recently_completed(RECENTLY_COMPLETED_LIMIT),
            tasks.upcoming_deadlines(now, UPCOMING_DEADLINES_LIMIT),
        )?;

        Ok(DashboardStats {
            total_tasks,
            completed_tasks,
            in_progress_tasks,
            overdue_tasks,
            tasks_by_priority: priority_counts(by_priority),
            tasks_by_status: status_counts(by_status),
            recently_completed: recently_completed.into_iter().map(completed_summary).collect(),
            upcoming_deadlines: upcoming_deadlines
                .into_iter()
                .filter_map(deadline_summary)
                .collect(),
            generated_at: now,
        })
    }
}

fn priority_counts(groups: Vec<(String, u64)>) -> Vec<PriorityCount> {
    let mut counts: HashMap<String, u64> = groups.into_iter().collect();
    let filled = TaskPriority::ALL
        .into_iter()
        .map(|priority| PriorityCount {
            priority,
            count: counts.remove(priority.as_str()).unwrap_or(0),
        })
        .collect();
    warn_unknown_groups("priority", counts);
    filled
}

fn status_counts(groups: Vec<(String, u64)>) -> Vec<StatusCount> {
    let mut counts: HashMap<String, u64> = groups.into_iter().collect();
    let filled = TaskStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: counts.remove(status.as_str()).unwrap_or(0),
        })
        .collect();
    warn_unknown_groups("status", counts);
    filled
}

fn warn_unknown_groups(grouping: &'static str, leftover: HashMap<String, u64>) {
    for (label, count) in leftover {
        warn!(grouping, label = %label, count, "ignoring unknown group label");
    }
}

fn completed_summary(task: TaskRecord) -> CompletedTaskSummary {
    CompletedTaskSummary {
        id: task.id,
        title: task.title,
        completed_at: task.completed_at,
    }
}

fn deadline_summary(task: TaskRecord) -> Option<DeadlineSummary> {
    Some(DeadlineSummary {
        id: task.id,
        due_date: task.due_date?,
        title: task.title,
        priority: task.priority,
    })
}

#[cfg(test)]
mod tests {
    use time::Duration;
    use time::macros::datetime;

    use super::*;
    use crate::application::repos::{CreateTaskParams, TasksWriteRepo};
    use crate::cache::{CacheConfig, CacheStatus, MemoryCacheStore};
    use crate::infra::memory::InMemoryRepositories;
    use crate::util::clock::ManualClock;

    const NOW: OffsetDateTime = datetime!(2026-07-15 09:30 UTC);

    async fn insert(
        repos: &InMemoryRepositories,
        title: &str,
        priority: TaskPriority,
        status: TaskStatus,
        due: Option<OffsetDateTime>,
        completed: Option<OffsetDateTime>,
    ) -> TaskRecord {
        repos
            .insert_task(CreateTaskParams {
                title: title.to_string(),
                description: None,
                priority,
                status,
                due_date: due,
                assigned_to: None,
                tags: Vec::new(),
                project_id: 1,
                created_at: NOW - Duration::days(30),
                completed_at: completed,
            })
            .await
            .expect("insert")
    }

    #[test]
    fn group_counts_are_zero_filled_in_enum_order() {
        let statuses = status_counts(vec![("done".into(), 2), ("bogus".into(), 9)]);
        assert_eq!(statuses.len(), TaskStatus::ALL.len());
        assert_eq!(statuses[0], StatusCount { status: TaskStatus::Todo, count: 0 });
        assert_eq!(statuses[3], StatusCount { status: TaskStatus::Done, count: 2 });

        let priorities = priority_counts(Vec::new());
        assert!(priorities.iter().all(|entry| entry.count == 0));
        assert_eq!(priorities[3].priority, TaskPriority::Critical);
    }

    #[tokio::test]
    async fn computes_counts_and_lists_from_one_instant() {
        let repos = Arc::new(InMemoryRepositories::new());
        repos.put_project("Work", "#3B82F6", false, NOW);

        let overdue = insert(
            &repos,
            "overdue",
            TaskPriority::High,
            TaskStatus::InProgress,
            Some(NOW - Duration::days(1)),
            None,
        )
        .await;
        let late_done = insert(
            &repos,
            "done-late",
            TaskPriority::Low,
            TaskStatus::Done,
            Some(NOW - Duration::days(2)),
            Some(NOW - Duration::hours(1)),
        )
        .await;
        let early_done = insert(
            &repos,
            "done-early",
            TaskPriority::Low,
            TaskStatus::Done,
            None,
            Some(NOW - Duration::days(3)),
        )
        .await;
        let upcoming = insert(
            &repos,
            "upcoming",
            TaskPriority::Critical,
            TaskStatus::Todo,
            Some(NOW + Duration::days(3)),
            None,
        )
        .await;

        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(NOW));
        let stats = DashboardService::new(repos, clock)
            .get_dashboard_stats()
            .await
            .expect("stats");
        assert_eq!(stats.status, CacheStatus::Bypass);

        let stats = stats.value;
        assert_eq!(stats.total_tasks, 4);
        assert_eq!(stats.completed_tasks, 2);
        assert_eq!(stats.in_progress_tasks, 1);
        assert_eq!(stats.overdue_tasks, 1);
        assert_eq!(stats.generated_at, NOW);
        assert_eq!(
            stats
                .recently_completed
                .iter()
                .map(|summary| summary.id)
                .collect::<Vec<_>>(),
            vec![late_done.id, early_done.id]
        );
        assert_eq!(stats.upcoming_deadlines.len(), 1);
        assert_eq!(stats.upcoming_deadlines[0].id, upcoming.id);
        assert_ne!(stats.upcoming_deadlines[0].id, overdue.id);
        assert_eq!(
            stats.tasks_by_priority[TaskPriority::Low as usize].count,
            2
        );
    }

    #[tokio::test]
    async fn snapshot_is_served_until_ttl_expires() {
        let clock = ManualClock::new(NOW);
        let clock_dyn: Arc<dyn Clock> = Arc::new(clock.clone());
        let repos = Arc::new(InMemoryRepositories::new());
        repos.put_project("Work", "#3B82F6", false, NOW);
        let store = Arc::new(MemoryCacheStore::new(clock_dyn.clone()));
        let cache = Arc::new(CacheLayer::new(store, CacheConfig::default()));
        let service = DashboardService::new(repos.clone(), clock_dyn).with_cache_opt(Some(cache));

        let first = service.get_dashboard_stats().await.expect("stats");
        assert_eq!(first.status, CacheStatus::Miss);
        let reads_after_miss = repos.task_reads();

        insert(&repos, "new", TaskPriority::Low, TaskStatus::Todo, None, None).await;
        clock.advance(Duration::seconds(9));
        let cached = service.get_dashboard_stats().await.expect("stats");
        assert_eq!(cached.status, CacheStatus::Hit);
        assert_eq!(cached.value, first.value);
        assert_eq!(repos.task_reads(), reads_after_miss);

        clock.advance(Duration::seconds(1));
        let refreshed = service.get_dashboard_stats().await.expect("stats");
        assert_eq!(refreshed.status, CacheStatus::Miss);
        assert_eq!(refreshed.value.total_tasks, 1);
    }
}
