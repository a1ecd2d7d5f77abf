/// Task attachments
///
/// Attachments record where an uploaded file lives; the bytes themselves are
/// stored elsewhere and only the URL, name, size and MIME type are kept here.
///
/// ```sql
/// CREATE TABLE attachments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     uploaded_by UUID REFERENCES profiles(id) ON DELETE SET NULL,
///     filename VARCHAR(255) NOT NULL,
///     file_url VARCHAR(2048) NOT NULL,
///     file_size BIGINT NOT NULL CHECK (file_size >= 0),
///     mime_type VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::pagination::{Page, PageParams};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: Uuid,
    pub task_id: Uuid,
    pub uploaded_by: Option<Uuid>,
    pub filename: String,
    pub file_url: String,

    /// Bytes
    pub file_size: i64,

    pub mime_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateAttachment {
    pub task_id: Uuid,
    pub uploaded_by: Uuid,
    pub filename: String,
    pub file_url: String,
    pub file_size: i64,
    pub mime_type: Option<String>,
}

/// Attachment metadata that can be corrected after upload
#[derive(Debug, Clone, Default)]
pub struct UpdateAttachment {
    pub filename: Option<String>,
    pub mime_type: Option<Option<String>>,
}

impl Attachment {
    /// # Errors
    ///
    /// Check violation if `file_size` is negative.
    pub async fn create(pool: &PgPool, data: CreateAttachment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (task_id, uploaded_by, filename, file_url, file_size, mime_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, task_id, uploaded_by, filename, file_url, file_size, mime_type, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.uploaded_by)
        .bind(data.filename)
        .bind(data.file_url)
        .bind(data.file_size)
        .bind(data.mime_type)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, task_id, uploaded_by, filename, file_url, file_size, mime_type, created_at
            FROM attachments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Attachments of a task, newest first
    pub async fn list_by_task(
        pool: &PgPool,
        task_id: Uuid,
        page: PageParams,
    ) -> Result<Page<Self>, sqlx::Error> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM attachments WHERE task_id = $1")
            .bind(task_id)
            .fetch_one(pool)
            .await?;

        let attachments = sqlx::query_as::<_, Attachment>(
            r#"
            SELECT id, task_id, uploaded_by, filename, file_url, file_size, mime_type, created_at
            FROM attachments
            WHERE task_id = $1
            ORDER BY created_at DESC, id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(task_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        Ok(Page::new(attachments, total, page))
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateAttachment,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE attachments SET ");
        let mut separated = qb.separated(", ");

        separated.push("id = id");
        if let Some(filename) = data.filename {
            separated.push("filename = ").push_bind_unseparated(filename);
        }
        if let Some(mime_type) = data.mime_type {
            separated.push("mime_type = ").push_bind_unseparated(mime_type);
        }

        qb.push(" WHERE id = ").push_bind(id).push(
            " RETURNING id, task_id, uploaded_by, filename, file_url, file_size, mime_type, created_at",
        );

        qb.build_query_as::<Attachment>().fetch_optional(pool).await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
