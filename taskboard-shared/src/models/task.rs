/// Task model and database operations
///
/// Tasks belong to a project. `completed_at` tracks the status: it is
/// stamped when a task enters `done` and cleared when it leaves.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'review', 'done');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'urgent');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     creator_id UUID REFERENCES profiles(id) ON DELETE SET NULL,
///     assignee_id UUID REFERENCES profiles(id) ON DELETE SET NULL,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_date DATE,
///     completed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::task::{Task, TaskFilter, TaskStatus};
/// use taskboard_shared::pagination::PageParams;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let filter = TaskFilter {
///     status: Some(TaskStatus::InProgress),
///     search: Some("invoice".to_string()),
///     ..TaskFilter::visible_to(user_id)
/// };
/// let page = Task::list(&pool, &filter, PageParams::default()).await?;
/// println!("{} of {} tasks", page.data.len(), page.total);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::transaction::with_transaction;
use crate::models::tag::Tag;
use crate::pagination::{Page, PageParams};
use crate::query::{search_pattern, Conditions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Todo
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
            TaskPriority::Urgent => "urgent",
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Medium
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,

    /// None once the creator's profile is deleted
    pub creator_id: Option<Uuid>,

    pub assignee_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,

    /// Set while `status` is `done`
    pub completed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub creator_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<NaiveDate>,
}

/// Input for updating a task
///
/// `project_id` and `creator_id` cannot change. Nullable fields use
/// `Some(None)` to clear.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Option<Uuid>>,
    pub due_date: Option<Option<NaiveDate>>,
}

/// Task list filter
///
/// Results are always limited to projects `viewer_id` is a member of.
#[derive(Debug, Clone)]
pub struct TaskFilter {
    pub viewer_id: Uuid,
    pub project_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,

    /// Case-insensitive substring match on title or description
    pub search: Option<String>,

    /// Inclusive lower bound on `due_date`
    pub due_from: Option<NaiveDate>,

    /// Inclusive upper bound on `due_date`
    pub due_to: Option<NaiveDate>,
}

impl TaskFilter {
    /// Unfiltered view of everything the user can read
    pub fn visible_to(viewer_id: Uuid) -> Self {
        Self {
            viewer_id,
            project_id: None,
            status: None,
            priority: None,
            assignee_id: None,
            search: None,
            due_from: None,
            due_to: None,
        }
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let mut conditions = Conditions::default();

        conditions
            .and(qb)
            .push("t.project_id IN (SELECT project_id FROM project_members WHERE user_id = ")
            .push_bind(self.viewer_id)
            .push(")");

        if let Some(project_id) = self.project_id {
            conditions.and(qb).push("t.project_id = ").push_bind(project_id);
        }
        if let Some(status) = self.status {
            conditions.and(qb).push("t.status = ").push_bind(status);
        }
        if let Some(priority) = self.priority {
            conditions.and(qb).push("t.priority = ").push_bind(priority);
        }
        if let Some(assignee_id) = self.assignee_id {
            conditions.and(qb).push("t.assignee_id = ").push_bind(assignee_id);
        }
        if let Some(pattern) = search_pattern(self.search.as_deref()) {
            conditions
                .and(qb)
                .push("(t.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR t.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(from) = self.due_from {
            conditions.and(qb).push("t.due_date >= ").push_bind(from);
        }
        if let Some(to) = self.due_to {
            conditions.and(qb).push("t.due_date <= ").push_bind(to);
        }
    }
}

/// Task counts across every project a user belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DashboardSummary {
    pub project_count: i64,
    pub total_tasks: i64,
    pub todo: i64,
    pub in_progress: i64,
    pub review: i64,
    pub done: i64,
    pub low: i64,
    pub medium: i64,
    pub high: i64,
    pub urgent: i64,

    /// Open tasks past their due date
    pub overdue: i64,

    /// Open tasks due within the next seven days
    pub due_soon: i64,

    /// Open tasks assigned to the user
    pub assigned_to_me: i64,
}

/// `completed_at` value for a task entering `status` from an unknown state
fn completed_at_for(status: TaskStatus, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    status.is_done().then_some(now)
}

impl Task {
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (project_id, creator_id, assignee_id, title, description,
                               status, priority, due_date, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, project_id, creator_id, assignee_id, title, description,
                      status, priority, due_date, completed_at, created_at, updated_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.creator_id)
        .bind(data.assignee_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.priority)
        .bind(data.due_date)
        .bind(completed_at_for(data.status, Utc::now()))
        .fetch_one(executor)
        .await
    }

    /// Creates a task and links the given tags in one transaction
    ///
    /// # Errors
    ///
    /// Foreign key violation if the assignee or any tag doesn't exist; nothing
    /// is written in that case.
    pub async fn create_with_tags(
        pool: &PgPool,
        data: CreateTask,
        tag_ids: Vec<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        with_transaction(pool, |conn| {
            Box::pin(async move {
                let task = Task::create(&mut *conn, data).await?;
                for tag_id in tag_ids {
                    Tag::attach(&mut *conn, task.id, tag_id).await?;
                }
                Ok::<_, sqlx::Error>(task)
            })
        })
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT id, project_id, creator_id, assignee_id, title, description,
                   status, priority, due_date, completed_at, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists tasks, soonest due first (undated last), then newest
    pub async fn list(
        pool: &PgPool,
        filter: &TaskFilter,
        page: PageParams,
    ) -> Result<Page<Self>, sqlx::Error> {
        let total = Self::count(pool, filter).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT t.id, t.project_id, t.creator_id, t.assignee_id, t.title, t.description, \
             t.status, t.priority, t.due_date, t.completed_at, t.created_at, t.updated_at \
             FROM tasks t",
        );
        filter.push_where(&mut qb);
        qb.push(" ORDER BY t.due_date ASC NULLS LAST, t.created_at DESC, t.id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let tasks = qb.build_query_as::<Task>().fetch_all(pool).await?;

        Ok(Page::new(tasks, total, page))
    }

    pub async fn count(pool: &PgPool, filter: &TaskFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks t");
        filter.push_where(&mut qb);

        qb.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Updates a task; returns None if it doesn't exist
    ///
    /// Moving into `done` stamps `completed_at` (keeping an existing stamp);
    /// moving out of `done` clears it.
    ///
    /// # Errors
    ///
    /// Foreign key violation if `assignee_id` names a missing profile; the
    /// row is left unchanged.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(title) = data.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(status) = data.status {
            qb.push(", status = ").push_bind(status);
            if status.is_done() {
                qb.push(", completed_at = COALESCE(completed_at, NOW())");
            } else {
                qb.push(", completed_at = NULL");
            }
        }
        if let Some(priority) = data.priority {
            qb.push(", priority = ").push_bind(priority);
        }
        if let Some(assignee_id) = data.assignee_id {
            qb.push(", assignee_id = ").push_bind(assignee_id);
        }
        if let Some(due_date) = data.due_date {
            qb.push(", due_date = ").push_bind(due_date);
        }

        qb.push(" WHERE id = ").push_bind(id).push(
            " RETURNING id, project_id, creator_id, assignee_id, title, description, \
             status, priority, due_date, completed_at, created_at, updated_at",
        );

        qb.build_query_as::<Task>().fetch_optional(pool).await
    }

    /// Deletes a task with its subtasks, comments, attachments and tag links
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Dashboard counts across the user's non-archived projects
    pub async fn summary_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<DashboardSummary, sqlx::Error> {
        sqlx::query_as::<_, DashboardSummary>(
            r#"
            WITH visible_projects AS (
                SELECT p.id
                FROM projects p
                JOIN project_members m ON m.project_id = p.id AND m.user_id = $1
                WHERE p.is_archived = FALSE
            )
            SELECT
                (SELECT COUNT(*) FROM visible_projects) AS project_count,
                COUNT(t.id) AS total_tasks,
                COUNT(t.id) FILTER (WHERE t.status = 'todo') AS todo,
                COUNT(t.id) FILTER (WHERE t.status = 'in_progress') AS in_progress,
                COUNT(t.id) FILTER (WHERE t.status = 'review') AS review,
                COUNT(t.id) FILTER (WHERE t.status = 'done') AS done,
                COUNT(t.id) FILTER (WHERE t.priority = 'low') AS low,
                COUNT(t.id) FILTER (WHERE t.priority = 'medium') AS medium,
                COUNT(t.id) FILTER (WHERE t.priority = 'high') AS high,
                COUNT(t.id) FILTER (WHERE t.priority = 'urgent') AS urgent,
                COUNT(t.id) FILTER (
                    WHERE t.due_date < CURRENT_DATE AND t.status <> 'done'
                ) AS overdue,
                COUNT(t.id) FILTER (
                    WHERE t.due_date BETWEEN CURRENT_DATE AND CURRENT_DATE + 7
                      AND t.status <> 'done'
                ) AS due_soon,
                COUNT(t.id) FILTER (
                    WHERE t.assignee_id = $1 AND t.status <> 'done'
                ) AS assigned_to_me
            FROM tasks t
            WHERE t.project_id IN (SELECT id FROM visible_projects)
            "#,
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
