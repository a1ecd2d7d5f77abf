/// Profile model and database operations
///
/// A profile is a user account. Profiles are created at registration and
/// referenced by projects (as owner), memberships, tasks (creator/assignee),
/// comments and attachments.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE profiles (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL,
///     full_name VARCHAR(255),
///     avatar_url VARCHAR(512),
///     password_hash VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ,
///     CONSTRAINT profiles_email_key UNIQUE (email)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::profile::{CreateProfile, Profile};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let profile = Profile::create(&pool, CreateProfile {
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     full_name: Some("Ada Lovelace".to_string()),
///     avatar_url: None,
/// }).await?;
///
/// let found = Profile::find_by_email(&pool, "ADA@example.com").await?;
/// assert_eq!(found.map(|p| p.id), Some(profile.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::pagination::{Page, PageParams};
use crate::query::{search_pattern, Conditions};

/// User account
///
/// `password_hash` is never serialized, so a `Profile` can be returned from
/// handlers directly.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,

    /// Case-insensitive, unique
    pub email: String,

    pub full_name: Option<String>,

    pub avatar_url: Option<String>,

    /// Argon2id hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// None until the first login
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a profile
#[derive(Debug, Clone)]
pub struct CreateProfile {
    pub email: String,

    /// Argon2id hash, never the plaintext password
    pub password_hash: String,

    pub full_name: Option<String>,

    pub avatar_url: Option<String>,
}

/// Input for updating a profile
///
/// Only `Some` fields are written. The nullable fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfile {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub full_name: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password_hash.is_none()
            && self.full_name.is_none()
            && self.avatar_url.is_none()
    }
}

/// Filter for listing profiles
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    /// Case-insensitive substring match on email or full name
    pub search: Option<String>,
}

impl ProfileFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        let mut conditions = Conditions::default();

        if let Some(pattern) = search_pattern(self.search.as_deref()) {
            conditions
                .and(qb)
                .push("(email::TEXT ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR full_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

impl Profile {
    /// Creates a new profile
    ///
    /// # Errors
    ///
    /// Unique violation on `profiles_email_key` if the email is taken
    /// (compared case-insensitively).
    pub async fn create(pool: &PgPool, data: CreateProfile) -> Result<Self, sqlx::Error> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (email, password_hash, full_name, avatar_url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, full_name, avatar_url, password_hash,
                      created_at, updated_at, last_login_at
            "#,
        )
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.full_name)
        .bind(data.avatar_url)
        .fetch_one(pool)
        .await?;

        Ok(profile)
    }

    /// Finds a profile by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, full_name, avatar_url, password_hash,
                   created_at, updated_at, last_login_at
            FROM profiles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(profile)
    }

    /// Finds a profile by email (case-insensitive via CITEXT)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let profile = sqlx::query_as::<_, Profile>(
            r#"
            SELECT id, email, full_name, avatar_url, password_hash,
                   created_at, updated_at, last_login_at
            FROM profiles
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(profile)
    }

    /// Whether a profile with this ID exists
    pub async fn exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM profiles WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Lists profiles ordered by email, then ID
    pub async fn list(
        pool: &PgPool,
        filter: &ProfileFilter,
        page: PageParams,
    ) -> Result<Page<Self>, sqlx::Error> {
        let total = Self::count(pool, filter).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, email, full_name, avatar_url, password_hash, \
             created_at, updated_at, last_login_at FROM profiles",
        );
        filter.push_where(&mut qb);
        qb.push(" ORDER BY email ASC, id ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let profiles = qb.build_query_as::<Profile>().fetch_all(pool).await?;

        Ok(Page::new(profiles, total, page))
    }

    /// Counts profiles matching the filter
    pub async fn count(pool: &PgPool, filter: &ProfileFilter) -> Result<i64, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM profiles");
        filter.push_where(&mut qb);

        qb.build_query_scalar::<i64>().fetch_one(pool).await
    }

    /// Updates a profile
    ///
    /// Returns None if the profile doesn't exist.
    ///
    /// # Errors
    ///
    /// Unique violation if the new email belongs to another profile.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE profiles SET updated_at = NOW()");

        if let Some(email) = data.email {
            qb.push(", email = ").push_bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            qb.push(", password_hash = ").push_bind(password_hash);
        }
        if let Some(full_name) = data.full_name {
            qb.push(", full_name = ").push_bind(full_name);
        }
        if let Some(avatar_url) = data.avatar_url {
            qb.push(", avatar_url = ").push_bind(avatar_url);
        }

        qb.push(" WHERE id = ").push_bind(id).push(
            " RETURNING id, email, full_name, avatar_url, password_hash, \
             created_at, updated_at, last_login_at",
        );

        qb.build_query_as::<Profile>().fetch_optional(pool).await
    }

    /// Deletes a profile; returns false if it didn't exist
    ///
    /// # Errors
    ///
    /// Foreign key violation while the profile still owns projects.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Stamps `last_login_at` with the current time
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE profiles SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
