//! Cache key definitions.
//!
//! Every task list key starts with [`TASK_LIST_PREFIX`] so a single `tasks:*` scan reaches all
//! of them. The dashboard key lives outside that namespace and is only ever expired by TTL.

use std::fmt;

use crate::application::repos::TaskQueryFilter;
use crate::domain::types::{TaskPriority, TaskStatus};

pub const TASK_LIST_PREFIX: &str = "tasks:";
pub const TASK_LIST_PATTERN: &str = "tasks:*";
pub const DASHBOARD_STATS_KEY: &str = "dashboard:stats";

/// Placeholder for an absent filter component. Never a valid status, priority or id.
const UNSET: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A filtered task listing.
    TaskList {
        status: Option<TaskStatus>,
        priority: Option<TaskPriority>,
        project_id: Option<i32>,
    },
    /// The dashboard aggregate snapshot.
    DashboardStats,
}

impl CacheKey {
    pub fn task_list(filter: &TaskQueryFilter) -> Self {
        Self::TaskList {
            status: filter.status,
            priority: filter.priority,
            project_id: filter.project_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::TaskList { .. } => "task_list",
            Self::DashboardStats => "dashboard",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskList {
                status,
                priority,
                project_id,
            } => {
                f.write_str(TASK_LIST_PREFIX)?;
                f.write_str(status.map(TaskStatus::as_str).unwrap_or(UNSET))?;
                f.write_str(":")?;
                f.write_str(priority.map(TaskPriority::as_str).unwrap_or(UNSET))?;
                f.write_str(":")?;
                match project_id {
                    Some(id) => write!(f, "{id}"),
                    None => f.write_str(UNSET),
                }
            }
            Self::DashboardStats => f.write_str(DASHBOARD_STATS_KEY),
        }
    }
}

/// Render the cache key for a task listing filter.
pub fn task_list_key(filter: &TaskQueryFilter) -> String {
    CacheKey::task_list(filter).to_string()
}
