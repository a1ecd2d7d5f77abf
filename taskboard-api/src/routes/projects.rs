/// Project endpoints
///
/// # Endpoints
///
/// - `GET /v1/projects` - Caller's projects (`search`, `include_archived`)
/// - `POST /v1/projects` - Create a project; the caller becomes its owner
/// - `GET /v1/projects/:id` - Get a project (viewer+)
/// - `PATCH /v1/projects/:id` - Update a project (admin+)
/// - `DELETE /v1/projects/:id` - Delete a project and everything in it (owner)
/// - `GET /v1/projects/:id/stats` - Task counts for a project (viewer+)

use crate::{
    app::AppState,
    error::{required_text, validate_color, validate_nullable_len, ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    routes::{created, Created, DeleteResponse},
};
use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{
        authorization::{authorize, Resource, ResourcePermission},
        middleware::AuthContext,
    },
    models::{
        nullable,
        project::{CreateProject, Project, ProjectFilter, ProjectStats, ProjectWithRole, UpdateProject},
    },
    pagination::{Page, PageParams},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct ProjectListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
    pub include_archived: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: Option<String>,

    /// `#RRGGBB`
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    /// `null` clears the description
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    pub color: Option<String>,

    pub is_archived: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProjectStatsResponse {
    pub project_id: Uuid,

    #[serde(flatten)]
    pub stats: ProjectStats,

    /// Share of tasks done, 0.0 to 1.0
    pub completion_rate: f64,
}

/// List the caller's projects, newest first
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<ProjectListQuery>,
) -> ApiResult<Json<Page<ProjectWithRole>>> {
    let filter = ProjectFilter {
        search: query.search,
        include_archived: query.include_archived.unwrap_or(false),
    };
    let page = PageParams::new(query.limit, query.offset);

    Ok(Json(
        Project::list_for_user(&state.db, auth.user_id, &filter, page).await?,
    ))
}

/// Create a project
///
/// The project row and the caller's `owner` membership are written in one
/// transaction.
///
/// # Endpoint
///
/// ```text
/// POST /v1/projects
/// Content-Type: application/json
///
/// { "name": "Website relaunch", "color": "#0ea5e9" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateProjectRequest>,
) -> ApiResult<Created<Project>> {
    if let Some(color) = req.color.as_deref() {
        validate_color("color", color)?;
    }

    let project = Project::create_with_owner(
        &state.db,
        CreateProject {
            name: required_text("name", &req.name)?,
            description: req.description,
            owner_id: auth.user_id,
            color: req.color,
        },
    )
    .await?;

    Ok(created(project))
}

/// Get a project with the caller's role
///
/// # Errors
///
/// - `403 Forbidden`: Not a member
/// - `404 Not Found`: No such project
pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ProjectWithRole>> {
    let access = authorize(&state.db, auth.user_id, Resource::Project(id), ResourcePermission::Read).await?;

    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Json(ProjectWithRole {
        project,
        role: access.role,
    }))
}

/// Update a project
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Below admin
/// - `404 Not Found`: No such project
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    validate_nullable_len("description", &req.description, 10000)?;
    if let Some(color) = req.color.as_deref() {
        validate_color("color", color)?;
    }

    authorize(&state.db, auth.user_id, Resource::Project(id), ResourcePermission::Manage).await?;

    let update = UpdateProject {
        name: req.name.as_deref().map(|n| required_text("name", n)).transpose()?,
        description: req.description,
        color: req.color,
        is_archived: req.is_archived,
    };

    let project = Project::update(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Json(project))
}

/// Delete a project
///
/// Memberships, tasks and everything under the tasks go with it.
///
/// # Errors
///
/// - `403 Forbidden`: Not the owner
/// - `404 Not Found`: No such project
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    authorize(&state.db, auth.user_id, Resource::Project(id), ResourcePermission::Own).await?;

    if !Project::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    tracing::info!(project_id = %id, user_id = %auth.user_id, "Project deleted");
    Ok(DeleteResponse::new(id))
}

/// Task counts and completion rate for a project
pub async fn get_project_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ProjectStatsResponse>> {
    authorize(&state.db, auth.user_id, Resource::Project(id), ResourcePermission::Read).await?;

    let stats = Project::stats(&state.db, id).await?;

    Ok(Json(ProjectStatsResponse {
        project_id: id,
        completion_rate: stats.completion_rate(),
        stats,
    }))
}
