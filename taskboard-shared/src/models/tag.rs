/// Tags and task/tag links
///
/// Tags form one global vocabulary shared by every project; names are unique.
/// A task carries any number of tags through `task_tags`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tags (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(50) NOT NULL,
///     color VARCHAR(7) NOT NULL DEFAULT '#64748b',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT tags_name_key UNIQUE (name)
/// );
///
/// CREATE TABLE task_tags (
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     tag_id UUID NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
///     PRIMARY KEY (task_id, tag_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::pagination::{Page, PageParams};
use crate::query::{search_pattern, Conditions};

/// Color assigned when none is given
pub const DEFAULT_TAG_COLOR: &str = "#64748b";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTag {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTag {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// Link between a task and a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskTag {
    pub task_id: Uuid,
    pub tag_id: Uuid,
}

impl Tag {
    /// # Errors
    ///
    /// Unique violation on `tags_name_key` if the name exists.
    pub async fn create(pool: &PgPool, data: CreateTag) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name, color)
            VALUES ($1, $2)
            RETURNING id, name, color, created_at
            "#,
        )
        .bind(data.name)
        .bind(data.color.unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string()))
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT id, name, color, created_at FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists tags alphabetically, optionally filtered by a case-insensitive
    /// substring of the name
    pub async fn list(
        pool: &PgPool,
        search: Option<&str>,
        page: PageParams,
    ) -> Result<Page<Self>, sqlx::Error> {
        let pattern = search_pattern(search);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tags");
        push_name_filter(&mut count, pattern.clone());
        let total = count.build_query_scalar::<i64>().fetch_one(pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new("SELECT id, name, color, created_at FROM tags");
        push_name_filter(&mut qb, pattern);
        qb.push(" ORDER BY name ASC, id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let tags = qb.build_query_as::<Tag>().fetch_all(pool).await?;

        Ok(Page::new(tags, total, page))
    }

    pub async fn update(pool: &PgPool, id: Uuid, data: UpdateTag) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tags SET ");
        let mut separated = qb.separated(", ");

        // id = id keeps the statement valid when nothing else is set
        separated.push("id = id");
        if let Some(name) = data.name {
            separated.push("name = ").push_bind_unseparated(name);
        }
        if let Some(color) = data.color {
            separated.push("color = ").push_bind_unseparated(color);
        }

        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING id, name, color, created_at");

        qb.build_query_as::<Tag>().fetch_optional(pool).await
    }

    /// Deletes a tag and unlinks it from every task
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Links a tag to a task
    ///
    /// # Errors
    ///
    /// - Unique violation if the link already exists
    /// - Foreign key violation if the task or tag doesn't exist
    pub async fn attach<'e, E>(executor: E, task_id: Uuid, tag_id: Uuid) -> Result<TaskTag, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, TaskTag>(
            r#"
            INSERT INTO task_tags (task_id, tag_id)
            VALUES ($1, $2)
            RETURNING task_id, tag_id
            "#,
        )
        .bind(task_id)
        .bind(tag_id)
        .fetch_one(executor)
        .await
    }

    /// Removes a link; returns false if it didn't exist
    pub async fn detach(pool: &PgPool, task_id: Uuid, tag_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM task_tags WHERE task_id = $1 AND tag_id = $2")
            .bind(task_id)
            .bind(tag_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Tags on a task, alphabetically
    pub async fn list_for_task(pool: &PgPool, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Tag>(
            r#"
            SELECT g.id, g.name, g.color, g.created_at
            FROM tags g
            JOIN task_tags tt ON tt.tag_id = g.id
            WHERE tt.task_id = $1
            ORDER BY g.name ASC, g.id ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }
}

fn push_name_filter(qb: &mut QueryBuilder<'_, Postgres>, pattern: Option<String>) {
    if let Some(pattern) = pattern {
        Conditions::new().and(qb).push("name ILIKE ").push_bind(pattern);
    }
}
