use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::{
    application::repos::{
        CreateTaskParams, RepoError, TaskCountPredicate, TaskGrouping, TaskQueryFilter, TasksRepo,
        TasksWriteRepo, UpdateTaskParams,
    },
    domain::{
        entities::TaskRecord,
        types::{TaskPriority, TaskStatus},
    },
};

use super::{PostgresRepositories, TASK_COLUMNS, map_sqlx_error};

const LISTING_ORDER: &str = " ORDER BY priority DESC, due_date ASC NULLS LAST, id ASC";

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: i32,
    title: String,
    description: Option<String>,
    priority: TaskPriority,
    status: TaskStatus,
    created_at: OffsetDateTime,
    due_date: Option<OffsetDateTime>,
    completed_at: Option<OffsetDateTime>,
    assigned_to: Option<String>,
    tags: Vec<String>,
    project_id: i32,
}

impl From<TaskRow> for TaskRecord {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            priority: row.priority,
            status: row.status,
            created_at: row.created_at,
            due_date: row.due_date,
            completed_at: row.completed_at,
            assigned_to: row.assigned_to,
            tags: row.tags,
            project_id: row.project_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    label: String,
    count: i64,
}

impl PostgresRepositories {
    fn select_tasks<'q>() -> QueryBuilder<'q, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(TASK_COLUMNS);
        qb.push(" FROM tasks WHERE TRUE");
        qb
    }

    fn apply_task_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &TaskQueryFilter) {
        if let Some(status) = filter.status {
            qb.push(" AND status = ");
            qb.push_bind(status);
        }
        if let Some(priority) = filter.priority {
            qb.push(" AND priority = ");
            qb.push_bind(priority);
        }
        if let Some(project_id) = filter.project_id {
            qb.push(" AND project_id = ");
            qb.push_bind(project_id);
        }
    }

    async fn fetch_tasks(&self, mut qb: QueryBuilder<'_, Postgres>) -> Result<Vec<TaskRecord>, RepoError> {
        let rows = qb
            .build_query_as::<TaskRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(TaskRecord::from).collect())
    }
}

#[async_trait]
impl TasksRepo for PostgresRepositories {
    async fn find_tasks(&self, filter: &TaskQueryFilter) -> Result<Vec<TaskRecord>, RepoError> {
        let mut qb = Self::select_tasks();
        Self::apply_task_filter(&mut qb, filter);
        qb.push(LISTING_ORDER);
        self.fetch_tasks(qb).await
    }

    async fn find_task_by_id(&self, id: i32) -> Result<Option<TaskRecord>, RepoError> {
        let mut qb = Self::select_tasks();
        qb.push(" AND id = ");
        qb.push_bind(id);
        let row = qb
            .build_query_as::<TaskRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(TaskRecord::from))
    }

    async fn count_tasks(&self, predicate: TaskCountPredicate) -> Result<u64, RepoError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM tasks");
        match predicate {
            TaskCountPredicate::All => {}
            TaskCountPredicate::Status(status) => {
                qb.push(" WHERE status = ");
                qb.push_bind(status);
            }
            TaskCountPredicate::Overdue { now } => {
                qb.push(" WHERE due_date < ");
                qb.push_bind(now);
                qb.push(" AND status <> ");
                qb.push_bind(TaskStatus::Done);
            }
        }

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Self::convert_count(count)
    }

    async fn group_count(&self, grouping: TaskGrouping) -> Result<Vec<(String, u64)>, RepoError> {
        let sql = match grouping {
            TaskGrouping::Status => {
                "SELECT status::text AS label, COUNT(*) AS count FROM tasks GROUP BY status"
            }
            TaskGrouping::Priority => {
                "SELECT priority::text AS label, COUNT(*) AS count FROM tasks GROUP BY priority"
            }
        };

        let rows = sqlx::query_as::<_, GroupRow>(sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| Ok((row.label, Self::convert_count(row.count)?)))
            .collect()
    }

    async fn recently_completed(&self, limit: u32) -> Result<Vec<TaskRecord>, RepoError> {
        let mut qb = Self::select_tasks();
        qb.push(" AND status = ");
        qb.push_bind(TaskStatus::Done);
        qb.push(" ORDER BY completed_at DESC NULLS LAST, id ASC LIMIT ");
        qb.push_bind(i64::from(limit));
        self.fetch_tasks(qb).await
    }

    async fn upcoming_deadlines(
        &self,
        now: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<TaskRecord>, RepoError> {
        let mut qb = Self::select_tasks();
        qb.push(" AND due_date > ");
        qb.push_bind(now);
        qb.push(" AND status <> ");
        qb.push_bind(TaskStatus::Done);
        qb.push(" ORDER BY due_date ASC, id ASC LIMIT ");
        qb.push_bind(i64::from(limit));
        self.fetch_tasks(qb).await
    }
}

#[async_trait]
impl TasksWriteRepo for PostgresRepositories {
    async fn insert_task(&self, params: CreateTaskParams) -> Result<TaskRecord, RepoError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO tasks (title, description, priority, status, created_at, due_date, \
             completed_at, assigned_to, tags, project_id) ",
        );
        qb.push_values(std::iter::once(params), |mut row, params| {
            row.push_bind(params.title)
                .push_bind(params.description)
                .push_bind(params.priority)
                .push_bind(params.status)
                .push_bind(params.created_at)
                .push_bind(params.due_date)
                .push_bind(params.completed_at)
                .push_bind(params.assigned_to)
                .push_bind(params.tags)
                .push_bind(params.project_id);
        });
        qb.push(" RETURNING ");
        qb.push(TASK_COLUMNS);

        let row = qb
            .build_query_as::<TaskRow>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_task(
        &self,
        id: i32,
        params: UpdateTaskParams,
    ) -> Result<Option<TaskRecord>, RepoError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE tasks SET title = ");
        qb.push_bind(params.title);
        qb.push(", description = ");
        qb.push_bind(params.description);
        qb.push(", priority = ");
        qb.push_bind(params.priority);
        qb.push(", status = ");
        qb.push_bind(params.status);
        qb.push(", due_date = ");
        qb.push_bind(params.due_date);
        qb.push(", assigned_to = ");
        qb.push_bind(params.assigned_to);
        qb.push(", tags = ");
        qb.push_bind(params.tags);
        // The first completion wins; later updates never overwrite it.
        qb.push(", completed_at = COALESCE(completed_at, ");
        qb.push_bind(params.completed_at_if_unset);
        qb.push(") WHERE id = ");
        qb.push_bind(id);
        qb.push(" RETURNING ");
        qb.push(TASK_COLUMNS);

        let row = qb
            .build_query_as::<TaskRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(TaskRecord::from))
    }

    async fn delete_task(&self, id: i32) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
