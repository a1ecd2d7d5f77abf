/// Project model and database operations
///
/// Every project has exactly one owner, recorded twice: as `projects.owner_id`
/// and as the single `owner` row in `project_members`. Both are written by
/// [`Project::create_with_owner`] in one transaction, and neither changes
/// afterwards.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     owner_id UUID NOT NULL REFERENCES profiles(id) ON DELETE RESTRICT,
///     color VARCHAR(7) NOT NULL DEFAULT '#6366f1',
///     is_archived BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Deleting a project cascades to its memberships, tasks and everything under
/// the tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::db::transaction::with_transaction;
use crate::models::project_member::{CreateProjectMember, ProjectMember, ProjectRole};
use crate::pagination::{Page, PageParams};
use crate::query::{search_pattern, Conditions};

/// Color assigned when none is given
pub const DEFAULT_PROJECT_COLOR: &str = "#6366f1";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,

    /// `#RRGGBB`
    pub color: String,

    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project as seen by one caller, with the caller's role attached
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectWithRole {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: Project,

    pub role: ProjectRole,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,

    /// Falls back to [`DEFAULT_PROJECT_COLOR`]
    pub color: Option<String>,
}

/// Input for updating a project; `owner_id` is deliberately absent
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<String>,
    pub is_archived: Option<bool>,
}

/// Filter for listing a caller's projects
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Case-insensitive substring match on name or description
    pub search: Option<String>,

    /// Archived projects are hidden unless set
    pub include_archived: bool,
}

/// Task counts for one project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectStats {
    pub total_tasks: i64,
    pub todo: i64,
    pub in_progress: i64,
    pub review: i64,
    pub done: i64,
    pub overdue: i64,
    pub member_count: i64,
}

impl ProjectStats {
    /// Share of tasks in `done`, from 0.0 to 1.0
    pub fn completion_rate(&self) -> f64 {
        if self.total_tasks == 0 {
            0.0
        } else {
            self.done as f64 / self.total_tasks as f64
        }
    }
}

impl ProjectFilter {
    /// Appends the caller scope and filters; `p` is `projects`, `m` the
    /// caller's membership row
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let mut conditions = Conditions::default();

        if !self.include_archived {
            conditions.and(qb).push("p.is_archived = FALSE");
        }

        if let Some(pattern) = search_pattern(self.search.as_deref()) {
            conditions
                .and(qb)
                .push("(p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

impl Project {
    /// Inserts the project row only
    ///
    /// Use [`Project::create_with_owner`] outside of tests; a project without
    /// its owner membership breaks the one-owner invariant.
    pub async fn create<'e, E>(executor: E, data: CreateProject) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (name, description, owner_id, color)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, owner_id, color, is_archived,
                      created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.description)
        .bind(data.owner_id)
        .bind(data.color.unwrap_or_else(|| DEFAULT_PROJECT_COLOR.to_string()))
        .fetch_one(executor)
        .await
    }

    /// Creates a project and its owner membership atomically
    ///
    /// Either both rows exist afterwards or neither does.
    ///
    /// # Errors
    ///
    /// - Foreign key violation if `owner_id` is not a profile
    /// - Check/length violations from the column constraints
    pub async fn create_with_owner(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let project = with_transaction(pool, |conn| {
            Box::pin(async move {
                let project = Project::create(&mut *conn, data).await?;

                ProjectMember::create(
                    &mut *conn,
                    CreateProjectMember {
                        project_id: project.id,
                        user_id: project.owner_id,
                        role: ProjectRole::Owner,
                    },
                )
                .await?;

                Ok::<_, sqlx::Error>(project)
            })
        })
        .await?;

        info!(project_id = %project.id, owner_id = %project.owner_id, "Project created");
        Ok(project)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, description, owner_id, color, is_archived,
                   created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Projects the user belongs to, newest first
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
        filter: &ProjectFilter,
        page: PageParams,
    ) -> Result<Page<ProjectWithRole>, sqlx::Error> {
        let total = Self::count_for_user(pool, user_id, filter).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT p.id, p.name, p.description, p.owner_id, p.color, p.is_archived, \
             p.created_at, p.updated_at, m.role \
             FROM projects p \
             JOIN project_members m ON m.project_id = p.id AND m.user_id = ",
        );
        qb.push_bind(user_id);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let projects = qb.build_query_as::<ProjectWithRole>().fetch_all(pool).await?;

        Ok(Page::new(projects, total, page))
    }

    pub async fn count_for_user(
        pool: &PgPool,
        user_id: Uuid,
        filter: &ProjectFilter,
    ) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM projects p \
             JOIN project_members m ON m.project_id = p.id AND m.user_id = ",
        );
        qb.push_bind(user_id);
        filter.push_where(&mut qb);

        qb.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Updates a project; returns None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE projects SET updated_at = NOW()");

        if let Some(name) = data.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(color) = data.color {
            qb.push(", color = ").push_bind(color);
        }
        if let Some(is_archived) = data.is_archived {
            qb.push(", is_archived = ").push_bind(is_archived);
        }

        qb.push(" WHERE id = ").push_bind(id).push(
            " RETURNING id, name, description, owner_id, color, is_archived, \
             created_at, updated_at",
        );

        qb.build_query_as::<Project>().fetch_optional(pool).await
    }

    /// Deletes a project and everything under it; returns false if it didn't exist
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Task and member counts for a project
    pub async fn stats(pool: &PgPool, id: Uuid) -> Result<ProjectStats, sqlx::Error> {
        sqlx::query_as::<_, ProjectStats>(
            r#"
            SELECT
                COUNT(t.id) AS total_tasks,
                COUNT(t.id) FILTER (WHERE t.status = 'todo') AS todo,
                COUNT(t.id) FILTER (WHERE t.status = 'in_progress') AS in_progress,
                COUNT(t.id) FILTER (WHERE t.status = 'review') AS review,
                COUNT(t.id) FILTER (WHERE t.status = 'done') AS done,
                COUNT(t.id) FILTER (
                    WHERE t.due_date < CURRENT_DATE AND t.status <> 'done'
                ) AS overdue,
                (SELECT COUNT(*) FROM project_members WHERE project_id = $1) AS member_count
            FROM tasks t
            WHERE t.project_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }
}
