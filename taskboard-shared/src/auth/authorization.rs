/// Project access guard
///
/// Every project-scoped resource (tasks, subtasks, comments, attachments,
/// memberships) is authorized against the project it belongs to. A single
/// query resolves the owning project, its `owner_id` and the caller's
/// membership role, and [`evaluate`] decides.
///
/// # Permission Model
///
/// 1. **Existence**: A missing resource (or project) is `NotFound`
/// 2. **Membership**: An authenticated non-member is `NotMember`
/// 3. **Role**: The caller's role must reach the permission's minimum role;
///    the project's `owner_id` always passes
///
/// The owner membership itself is immutable: see [`ensure_owner_untouched`].
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::authorization::{authorize, Resource, ResourcePermission};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, caller: Uuid, task_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let access = authorize(&pool, caller, Resource::Task(task_id), ResourcePermission::Write).await?;
/// println!("caller is {} on project {}", access.role.as_str(), access.project_id);
/// # Ok(())
/// # }
/// ```

use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::project_member::ProjectRole;

/// Authorization failure
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// The resource, or the project it belongs to, doesn't exist
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    /// Authenticated but not a member of the project
    #[error("Not a member of project {0}")]
    NotMember(Uuid),

    /// Member, but the role is too low
    #[error("Insufficient permissions: requires {}, has {}", .required.as_str(), .actual.as_str())]
    InsufficientRole {
        required: ProjectRole,
        actual: ProjectRole,
    },

    /// The owner membership cannot be changed, removed or granted
    #[error("The project owner's role cannot be changed or removed")]
    OwnerImmutable,

    /// Only the resource's author/subject may do this
    #[error("Not authorized to modify this resource")]
    NotAuthorized,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Permission levels for authorization checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResourcePermission {
    /// Viewer+
    Read,

    /// Member+
    Write,

    /// Admin+
    Manage,

    /// Owner only
    Own,
}

impl ResourcePermission {
    pub fn min_role(&self) -> ProjectRole {
        match self {
            ResourcePermission::Read => ProjectRole::Viewer,
            ResourcePermission::Write => ProjectRole::Member,
            ResourcePermission::Manage => ProjectRole::Admin,
            ResourcePermission::Own => ProjectRole::Owner,
        }
    }
}

/// A project-scoped resource to authorize against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Project(Uuid),
    Task(Uuid),
    Subtask(Uuid),
    Comment(Uuid),
    Attachment(Uuid),
}

impl Resource {
    pub fn id(&self) -> Uuid {
        match *self {
            Resource::Project(id)
            | Resource::Task(id)
            | Resource::Subtask(id)
            | Resource::Comment(id)
            | Resource::Attachment(id) => id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Project(_) => "Project",
            Resource::Task(_) => "Task",
            Resource::Subtask(_) => "Subtask",
            Resource::Comment(_) => "Comment",
            Resource::Attachment(_) => "Attachment",
        }
    }

    /// Subquery yielding the owning project's id for `$1`
    fn project_lookup(&self) -> &'static str {
        match self {
            Resource::Project(_) => "SELECT $1::UUID",
            Resource::Task(_) => "SELECT project_id FROM tasks WHERE id = $1",
            Resource::Subtask(_) => {
                "SELECT t.project_id FROM subtasks s JOIN tasks t ON t.id = s.task_id WHERE s.id = $1"
            }
            Resource::Comment(_) => {
                "SELECT t.project_id FROM comments c JOIN tasks t ON t.id = c.task_id WHERE c.id = $1"
            }
            Resource::Attachment(_) => {
                "SELECT t.project_id FROM attachments a JOIN tasks t ON t.id = a.task_id WHERE a.id = $1"
            }
        }
    }

    fn not_found(&self) -> AuthzError {
        AuthzError::NotFound {
            kind: self.kind(),
            id: self.id(),
        }
    }
}

/// Outcome of a successful check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProjectAccess {
    pub project_id: Uuid,
    pub owner_id: Uuid,

    /// The caller's effective role
    pub role: ProjectRole,
}

impl ProjectAccess {
    /// Re-checks an already resolved access against a stronger permission
    pub fn require(&self, permission: ResourcePermission) -> Result<(), AuthzError> {
        let required = permission.min_role();
        if self.role.has_permission(&required) {
            Ok(())
        } else {
            Err(AuthzError::InsufficientRole {
                required,
                actual: self.role,
            })
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccessRow {
    project_id: Uuid,
    owner_id: Uuid,
    role: Option<ProjectRole>,
}

/// Decides access from already-loaded facts
///
/// The project's `owner_id` is treated as `Owner` whatever its membership row
/// says. Returns the effective role.
pub fn evaluate(
    caller: Uuid,
    project_id: Uuid,
    owner_id: Uuid,
    role: Option<ProjectRole>,
    permission: ResourcePermission,
) -> Result<ProjectRole, AuthzError> {
    let actual = if caller == owner_id {
        ProjectRole::Owner
    } else {
        role.ok_or(AuthzError::NotMember(project_id))?
    };

    let required = permission.min_role();
    if actual.has_permission(&required) {
        Ok(actual)
    } else {
        Err(AuthzError::InsufficientRole { required, actual })
    }
}

/// Resolves the resource's project and checks the caller's permission on it
///
/// # Errors
///
/// - `NotFound` if the resource or its project doesn't exist
/// - `NotMember` / `InsufficientRole` if access is denied
/// - `Database` on query failure
pub async fn authorize(
    pool: &PgPool,
    caller: Uuid,
    resource: Resource,
    permission: ResourcePermission,
) -> Result<ProjectAccess, AuthzError> {
    let sql = format!(
        "SELECT p.id AS project_id, p.owner_id, m.role \
         FROM projects p \
         LEFT JOIN project_members m ON m.project_id = p.id AND m.user_id = $2 \
         WHERE p.id = ({})",
        resource.project_lookup()
    );

    let row = sqlx::query_as::<_, AccessRow>(&sql)
        .bind(resource.id())
        .bind(caller)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| resource.not_found())?;

    let role = evaluate(caller, row.project_id, row.owner_id, row.role, permission).map_err(|e| {
        debug!(
            user_id = %caller,
            project_id = %row.project_id,
            resource = resource.kind(),
            permission = ?permission,
            reason = %e,
            "Access denied"
        );
        e
    })?;

    Ok(ProjectAccess {
        project_id: row.project_id,
        owner_id: row.owner_id,
        role,
    })
}

/// Rejects any member-management change that touches the owner role
///
/// `current` is the target member's role (None when adding a new member);
/// `requested` is the role being assigned (None when removing).
pub fn ensure_owner_untouched(
    current: Option<ProjectRole>,
    requested: Option<ProjectRole>,
) -> Result<(), AuthzError> {
    if current == Some(ProjectRole::Owner) || requested.is_some_and(|r| !r.is_assignable()) {
        return Err(AuthzError::OwnerImmutable);
    }
    Ok(())
}

/// Passes only when the caller is `subject` (profile self-service, comment authorship)
pub fn require_self(caller: Uuid, subject: Uuid) -> Result<(), AuthzError> {
    if caller == subject {
        Ok(())
    } else {
        Err(AuthzError::NotAuthorized)
    }
}
