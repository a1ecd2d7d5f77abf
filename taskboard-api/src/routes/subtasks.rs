/// Subtask endpoints
///
/// # Endpoints
///
/// - `GET /v1/tasks/:id/subtasks` - Checklist of a task (viewer+)
/// - `POST /v1/tasks/:id/subtasks` - Add a subtask (member+)
/// - `GET /v1/subtasks/:id` - Get a subtask (viewer+)
/// - `PATCH /v1/subtasks/:id` - Rename or tick a subtask (member+)
/// - `DELETE /v1/subtasks/:id` - Delete a subtask (member+)

use crate::{
    app::AppState,
    error::{required_text, ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    routes::{created, Created, DeleteResponse, ListQuery},
};
use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use taskboard_shared::{
    auth::{
        authorization::{authorize, Resource, ResourcePermission},
        middleware::AuthContext,
    },
    models::subtask::{CreateSubtask, Subtask, UpdateSubtask},
    pagination::Page,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubtaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[serde(default)]
    pub is_completed: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSubtaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    pub is_completed: Option<bool>,
}

fn subtask_not_found() -> ApiError {
    ApiError::NotFound("Subtask not found".to_string())
}

pub async fn list_subtasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Page<Subtask>>> {
    authorize(&state.db, auth.user_id, Resource::Task(task_id), ResourcePermission::Read).await?;

    Ok(Json(Subtask::list_by_task(&state.db, task_id, query.page()).await?))
}

pub async fn create_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateSubtaskRequest>,
) -> ApiResult<Created<Subtask>> {
    let title = required_text("title", &req.title)?;

    authorize(&state.db, auth.user_id, Resource::Task(task_id), ResourcePermission::Write).await?;

    let subtask = Subtask::create(
        &state.db,
        CreateSubtask {
            task_id,
            title,
            is_completed: req.is_completed,
        },
    )
    .await?;

    Ok(created(subtask))
}

pub async fn get_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Subtask>> {
    authorize(&state.db, auth.user_id, Resource::Subtask(id), ResourcePermission::Read).await?;

    let subtask = Subtask::find_by_id(&state.db, id)
        .await?
        .ok_or_else(subtask_not_found)?;

    Ok(Json(subtask))
}

pub async fn update_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateSubtaskRequest>,
) -> ApiResult<Json<Subtask>> {
    authorize(&state.db, auth.user_id, Resource::Subtask(id), ResourcePermission::Write).await?;

    let update = UpdateSubtask {
        title: req.title.as_deref().map(|t| required_text("title", t)).transpose()?,
        is_completed: req.is_completed,
    };

    let subtask = Subtask::update(&state.db, id, update)
        .await?
        .ok_or_else(subtask_not_found)?;

    Ok(Json(subtask))
}

pub async fn delete_subtask(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    authorize(&state.db, auth.user_id, Resource::Subtask(id), ResourcePermission::Write).await?;

    if !Subtask::delete(&state.db, id).await? {
        return Err(subtask_not_found());
    }

    Ok(DeleteResponse::new(id))
}
