/// Comment endpoints
///
/// # Endpoints
///
/// - `GET /v1/tasks/:id/comments` - Thread of a task, oldest first (viewer+)
/// - `POST /v1/tasks/:id/comments` - Post a comment (member+)
/// - `GET /v1/comments/:id` - Get a comment (viewer+)
/// - `PATCH /v1/comments/:id` - Edit own comment (member+)
/// - `DELETE /v1/comments/:id` - Delete own comment (member+), or any comment (admin+)

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
        authorization::{authorize, require_self, Resource, ResourcePermission},
        middleware::AuthContext,
    },
    models::comment::{Comment, CommentWithAuthor, CreateComment},
    pagination::Page,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 10000, message = "Content must be 1-10000 characters"))]
    pub content: String,
}

fn comment_not_found() -> ApiError {
    ApiError::NotFound("Comment not found".to_string())
}

async fn find_comment(state: &AppState, id: Uuid) -> ApiResult<Comment> {
    Comment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(comment_not_found)
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Page<CommentWithAuthor>>> {
    authorize(&state.db, auth.user_id, Resource::Task(task_id), ResourcePermission::Read).await?;

    Ok(Json(Comment::list_by_task(&state.db, task_id, query.page()).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<CommentRequest>,
) -> ApiResult<Created<Comment>> {
    let content = required_text("content", &req.content)?;

    authorize(&state.db, auth.user_id, Resource::Task(task_id), ResourcePermission::Write).await?;

    let comment = Comment::create(
        &state.db,
        CreateComment {
            task_id,
            author_id: auth.user_id,
            content,
        },
    )
    .await?;

    Ok(created(comment))
}

pub async fn get_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Comment>> {
    authorize(&state.db, auth.user_id, Resource::Comment(id), ResourcePermission::Read).await?;

    Ok(Json(find_comment(&state, id).await?))
}

/// Edit a comment
///
/// # Errors
///
/// - `403 Forbidden`: Not the author, or the author is now a viewer
/// - `404 Not Found`: No such comment
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<CommentRequest>,
) -> ApiResult<Json<Comment>> {
    let content = required_text("content", &req.content)?;

    authorize(&state.db, auth.user_id, Resource::Comment(id), ResourcePermission::Write).await?;
    let comment = find_comment(&state, id).await?;
    require_self(auth.user_id, comment.author_id)?;

    let comment = Comment::update_content(&state.db, id, content)
        .await?
        .ok_or_else(comment_not_found)?;

    Ok(Json(comment))
}

/// Delete a comment
///
/// Authors with write access delete their own comments; admins and the
/// owner moderate anyone's.
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    let access =
        authorize(&state.db, auth.user_id, Resource::Comment(id), ResourcePermission::Read).await?;
    let comment = find_comment(&state, id).await?;

    if auth.is(comment.author_id) {
        access.require(ResourcePermission::Write)?;
    } else {
        access.require(ResourcePermission::Manage)?;
    }

    if !Comment::delete(&state.db, id).await? {
        return Err(comment_not_found());
    }

    tracing::debug!(comment_id = %id, user_id = %auth.user_id, "Comment deleted");
    Ok(DeleteResponse::new(id))
}
