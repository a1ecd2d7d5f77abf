/// Project membership and roles
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('owner', 'admin', 'member', 'viewer');
///
/// CREATE TABLE project_members (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
///     role project_role NOT NULL DEFAULT 'member',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
///
/// CREATE UNIQUE INDEX project_members_single_owner_idx
///     ON project_members(project_id) WHERE role = 'owner';
/// ```
///
/// # Roles
///
/// - **owner**: The project's `owner_id`; exactly one per project, never changed
///   or removed through membership management
/// - **admin**: Edits the project and manages members
/// - **member**: Creates and edits tasks
/// - **viewer**: Read-only

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::pagination::{Page, PageParams};

/// Role within a project, ordered `Owner > Admin > Member > Viewer`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    Owner,
    Admin,
    Member,
    Viewer,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Owner => "owner",
            ProjectRole::Admin => "admin",
            ProjectRole::Member => "member",
            ProjectRole::Viewer => "viewer",
        }
    }

    /// Whether this role is at least `required`
    pub fn has_permission(&self, required: &ProjectRole) -> bool {
        self.permission_level() >= required.permission_level()
    }

    fn permission_level(&self) -> u8 {
        match self {
            ProjectRole::Owner => 4,
            ProjectRole::Admin => 3,
            ProjectRole::Member => 2,
            ProjectRole::Viewer => 1,
        }
    }

    /// Whether the role can be granted through member management
    pub fn is_assignable(&self) -> bool {
        !matches!(self, ProjectRole::Owner)
    }
}

impl PartialOrd for ProjectRole {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProjectRole {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.permission_level().cmp(&other.permission_level())
    }
}

/// Membership row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub joined_at: DateTime<Utc>,
}

/// Membership row joined with the member's profile, as listed on the team page
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMemberDetail {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub joined_at: DateTime<Utc>,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Input for adding a member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    #[serde(default = "default_role")]
    pub role: ProjectRole,
}

fn default_role() -> ProjectRole {
    ProjectRole::Member
}

impl ProjectMember {
    /// Inserts a membership row
    ///
    /// Accepts any executor so it can run inside a transaction alongside the
    /// project insert.
    ///
    /// # Errors
    ///
    /// - Unique violation if the user is already a member, or if a second
    ///   `owner` row is attempted
    /// - Foreign key violation if the project or profile does not exist
    pub async fn create<'e, E>(executor: E, data: CreateProjectMember) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            INSERT INTO project_members (project_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING project_id, user_id, role, joined_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(executor)
        .await
    }

    pub async fn find(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT project_id, user_id, role, joined_at
            FROM project_members
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Member with profile fields, or None if not a member
    pub async fn find_detail(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ProjectMemberDetail>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMemberDetail>(
            r#"
            SELECT m.project_id, m.user_id, m.role, m.joined_at,
                   p.email::TEXT AS email, p.full_name, p.avatar_url
            FROM project_members m
            JOIN profiles p ON p.id = m.user_id
            WHERE m.project_id = $1 AND m.user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Changes a non-owner member's role
    ///
    /// The `role <> 'owner'` guard makes the owner row unchangeable at the
    /// statement level as well. Returns None if no such non-owner member.
    pub async fn update_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProjectMember>(
            r#"
            UPDATE project_members
            SET role = $3
            WHERE project_id = $1 AND user_id = $2 AND role <> 'owner'
            RETURNING project_id, user_id, role, joined_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(pool)
        .await
    }

    /// Removes a non-owner member; returns false if nothing was removed
    pub async fn delete(pool: &PgPool, project_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM project_members WHERE project_id = $1 AND user_id = $2 AND role <> 'owner'",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists members with profile details, owner first then by join time
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
        page: PageParams,
    ) -> Result<Page<ProjectMemberDetail>, sqlx::Error> {
        let total = Self::count_by_project(pool, project_id).await?;

        let members = sqlx::query_as::<_, ProjectMemberDetail>(
            r#"
            SELECT m.project_id, m.user_id, m.role, m.joined_at,
                   p.email::TEXT AS email, p.full_name, p.avatar_url
            FROM project_members m
            JOIN profiles p ON p.id = m.user_id
            WHERE m.project_id = $1
            ORDER BY (m.role = 'owner') DESC, m.joined_at ASC, m.user_id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(project_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

        Ok(Page::new(members, total, page))
    }

    pub async fn count_by_project(pool: &PgPool, project_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM project_members WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(ProjectRole::Owner.as_str(), "owner");
        assert_eq!(ProjectRole::Admin.as_str(), "admin");
        assert_eq!(ProjectRole::Member.as_str(), "member");
        assert_eq!(ProjectRole::Viewer.as_str(), "viewer");
    }

    #[test]
    fn test_role_order() {
        assert!(ProjectRole::Owner > ProjectRole::Admin);
        assert!(ProjectRole::Admin > ProjectRole::Member);
        assert!(ProjectRole::Member > ProjectRole::Viewer);

        let mut roles = vec![
            ProjectRole::Viewer,
            ProjectRole::Owner,
            ProjectRole::Member,
            ProjectRole::Admin,
        ];
        roles.sort();
        assert_eq!(
            roles,
            vec![
                ProjectRole::Viewer,
                ProjectRole::Member,
                ProjectRole::Admin,
                ProjectRole::Owner
            ]
        );
    }

    #[test]
    fn test_has_permission() {
        assert!(ProjectRole::Owner.has_permission(&ProjectRole::Owner));
        assert!(ProjectRole::Admin.has_permission(&ProjectRole::Member));
        assert!(ProjectRole::Viewer.has_permission(&ProjectRole::Viewer));
        assert!(!ProjectRole::Viewer.has_permission(&ProjectRole::Member));
        assert!(!ProjectRole::Admin.has_permission(&ProjectRole::Owner));
    }

    #[test]
    fn test_only_owner_is_unassignable() {
        assert!(!ProjectRole::Owner.is_assignable());
        assert!(ProjectRole::Admin.is_assignable());
        assert!(ProjectRole::Member.is_assignable());
        assert!(ProjectRole::Viewer.is_assignable());
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&ProjectRole::Admin).unwrap(), "\"admin\"");
        let role: ProjectRole = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(role, ProjectRole::Viewer);
        assert!(serde_json::from_str::<ProjectRole>("\"superuser\"").is_err());
    }

    #[test]
    fn test_create_member_default_role() {
        let data: CreateProjectMember = serde_json::from_value(serde_json::json!({
            "project_id": Uuid::nil(),
            "user_id": Uuid::nil(),
        }))
        .unwrap();
        assert_eq!(data.role, ProjectRole::Member);
    }
}
