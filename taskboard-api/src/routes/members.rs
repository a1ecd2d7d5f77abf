/// Project membership endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects/:id/members` - List members (viewer+)
/// - `POST /v1/projects/:id/members` - Add a member (admin+)
/// - `GET /v1/projects/:id/members/:user_id` - Get one member (viewer+)
/// - `PATCH /v1/projects/:id/members/:user_id` - Change a role (admin+)
/// - `DELETE /v1/projects/:id/members/:user_id` - Remove a member (admin+, or the member leaving)
///
/// # Owner Protection
///
/// The owner membership is created with the project and never changes. Any
/// request that would change or remove it, or grant `owner` to someone else,
/// fails with `403 owner_role_immutable` for every caller, member or not,
/// whatever their own role.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    routes::{created, Created, DeleteResponse, ListQuery},
};
use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use taskboard_shared::{
    auth::{
        authorization::{authorize, ensure_owner_untouched, Resource, ResourcePermission},
        middleware::AuthContext,
    },
    models::{
        profile::Profile,
        project::Project,
        project_member::{CreateProjectMember, ProjectMember, ProjectMemberDetail, ProjectRole},
    },
    pagination::Page,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    pub user_id: Uuid,

    /// Defaults to `member`
    #[serde(default = "default_role")]
    pub role: ProjectRole,
}

fn default_role() -> ProjectRole {
    ProjectRole::Member
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMemberRequest {
    pub role: ProjectRole,
}

/// Rejects changes to the owner's membership before any membership check
///
/// `requested` is the role being assigned (None when removing).
async fn protect_owner(
    state: &AppState,
    project_id: Uuid,
    target: Uuid,
    requested: Option<ProjectRole>,
) -> ApiResult<()> {
    let project = Project::find_by_id(&state.db, project_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    let current = (target == project.owner_id).then_some(ProjectRole::Owner);
    ensure_owner_untouched(current, requested)?;
    Ok(())
}

fn member_not_found() -> ApiError {
    ApiError::NotFound("Member not found".to_string())
}

/// List members, owner first
pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(project_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Page<ProjectMemberDetail>>> {
    authorize(&state.db, auth.user_id, Resource::Project(project_id), ResourcePermission::Read).await?;

    Ok(Json(
        ProjectMember::list_by_project(&state.db, project_id, query.page()).await?,
    ))
}

pub async fn get_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((project_id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<ProjectMemberDetail>> {
    authorize(&state.db, auth.user_id, Resource::Project(project_id), ResourcePermission::Read).await?;

    let member = ProjectMember::find_detail(&state.db, project_id, user_id)
        .await?
        .ok_or_else(member_not_found)?;

    Ok(Json(member))
}

/// Add a member
///
/// # Endpoint
///
/// ```text
/// POST /v1/projects/:id/members
/// Content-Type: application/json
///
/// { "user_id": "uuid", "role": "admin" }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Below admin, or `owner_role_immutable` when `role` is `owner`
/// - `404 Not Found`: No such project or profile
/// - `409 Conflict`: Already a member
pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(project_id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<AddMemberRequest>,
) -> ApiResult<Created<ProjectMemberDetail>> {
    ensure_owner_untouched(None, Some(req.role))?;
    authorize(&state.db, auth.user_id, Resource::Project(project_id), ResourcePermission::Manage).await?;

    if !Profile::exists(&state.db, req.user_id).await? {
        return Err(ApiError::NotFound("Profile not found".to_string()));
    }

    ProjectMember::create(
        &state.db,
        CreateProjectMember {
            project_id,
            user_id: req.user_id,
            role: req.role,
        },
    )
    .await?;

    let member = ProjectMember::find_detail(&state.db, project_id, req.user_id)
        .await?
        .ok_or_else(member_not_found)?;

    tracing::info!(
        project_id = %project_id,
        user_id = %req.user_id,
        role = req.role.as_str(),
        added_by = %auth.user_id,
        "Member added"
    );

    Ok(created(member))
}

/// Change a member's role
///
/// # Errors
///
/// - `403 Forbidden`: Below admin, or `owner_role_immutable` when the target
///   is the owner or the new role is `owner`
/// - `404 Not Found`: No such project or member
pub async fn update_member_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((project_id, user_id)): ApiPath<(Uuid, Uuid)>,
    ValidatedJson(req): ValidatedJson<UpdateMemberRequest>,
) -> ApiResult<Json<ProjectMemberDetail>> {
    protect_owner(&state, project_id, user_id, Some(req.role)).await?;
    authorize(&state.db, auth.user_id, Resource::Project(project_id), ResourcePermission::Manage).await?;

    ProjectMember::update_role(&state.db, project_id, user_id, req.role)
        .await?
        .ok_or_else(member_not_found)?;

    let member = ProjectMember::find_detail(&state.db, project_id, user_id)
        .await?
        .ok_or_else(member_not_found)?;

    tracing::info!(
        project_id = %project_id,
        user_id = %user_id,
        role = req.role.as_str(),
        changed_by = %auth.user_id,
        "Member role changed"
    );

    Ok(Json(member))
}

/// Remove a member
///
/// Admins remove anyone but the owner; any non-owner member may remove
/// themselves to leave the project.
///
/// # Errors
///
/// - `403 Forbidden`: Below admin removing someone else, or
///   `owner_role_immutable` when the target is the owner
/// - `404 Not Found`: No such project or member
pub async fn remove_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((project_id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<DeleteResponse>> {
    protect_owner(&state, project_id, user_id, None).await?;
    let access =
        authorize(&state.db, auth.user_id, Resource::Project(project_id), ResourcePermission::Read).await?;

    if !auth.is(user_id) {
        access.require(ResourcePermission::Manage)?;
    }

    if !ProjectMember::delete(&state.db, project_id, user_id).await? {
        return Err(member_not_found());
    }

    tracing::info!(
        project_id = %project_id,
        user_id = %user_id,
        removed_by = %auth.user_id,
        "Member removed"
    );

    Ok(DeleteResponse::new(user_id))
}
