use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    application::repos::{CreateProjectParams, ProjectsRepo, ProjectsWriteRepo, RepoError},
    domain::entities::{ProjectRecord, ProjectSummary},
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: i32,
    name: String,
    description: Option<String>,
    color: String,
    created_at: OffsetDateTime,
    is_archived: bool,
}

impl From<ProjectRow> for ProjectRecord {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            color: row.color,
            created_at: row.created_at,
            is_archived: row.is_archived,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProjectSummaryRow {
    #[sqlx(flatten)]
    project: ProjectRow,
    task_count: i64,
    completed_count: i64,
}

#[async_trait]
impl ProjectsRepo for PostgresRepositories {
    async fn find_projects(&self, include_archived: bool) -> Result<Vec<ProjectSummary>, RepoError> {
        let rows = sqlx::query_as::<_, ProjectSummaryRow>(
            r#"
            SELECT
                p.id,
                p.name,
                p.description,
                p.color,
                p.created_at,
                p.is_archived,
                COUNT(t.id) AS task_count,
                COUNT(t.id) FILTER (WHERE t.status = 'done') AS completed_count
            FROM projects p
            LEFT JOIN tasks t ON t.project_id = p.id
            WHERE $1 OR NOT p.is_archived
            GROUP BY p.id
            ORDER BY p.id
            "#,
        )
        .bind(include_archived)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(ProjectSummary {
                    task_count: Self::convert_count(row.task_count)?,
                    completed_count: Self::convert_count(row.completed_count)?,
                    project: row.project.into(),
                })
            })
            .collect()
    }

    async fn find_project_by_id(&self, id: i32) -> Result<Option<ProjectRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, name, description, color, created_at, is_archived
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProjectRecord::from))
    }
}

#[async_trait]
impl ProjectsWriteRepo for PostgresRepositories {
    async fn insert_project(&self, params: CreateProjectParams) -> Result<ProjectRecord, RepoError> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            INSERT INTO projects (name, description, color, is_archived, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, color, created_at, is_archived
            "#,
        )
        .bind(params.name)
        .bind(params.description)
        .bind(params.color)
        .bind(params.is_archived)
        .bind(params.created_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn delete_project(&self, id: i32) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}
