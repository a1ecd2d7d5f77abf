/// Attachment endpoints
///
/// Attachments are metadata records pointing at files stored elsewhere;
/// the API never receives file bytes.
///
/// # Endpoints
///
/// - `GET /v1/tasks/:id/attachments` - Attachments of a task, newest first (viewer+)
/// - `POST /v1/tasks/:id/attachments` - Register an attachment (member+)
/// - `GET /v1/attachments/:id` - Get an attachment (viewer+)
/// - `PATCH /v1/attachments/:id` - Rename or fix the MIME type (member+)
/// - `DELETE /v1/attachments/:id` - Delete an attachment (member+)

use crate::{
    app::AppState,
    error::{required_text, validate_nullable_len, ApiError, ApiResult},
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
    models::{
        attachment::{Attachment, CreateAttachment, UpdateAttachment},
        nullable,
    },
    pagination::Page,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAttachmentRequest {
    #[validate(length(min = 1, max = 255, message = "Filename must be 1-255 characters"))]
    pub filename: String,

    #[validate(
        url(message = "file_url must be a valid URL"),
        length(max = 2048, message = "file_url must be at most 2048 characters")
    )]
    pub file_url: String,

    /// Bytes
    #[validate(range(min = 0, message = "file_size must not be negative"))]
    pub file_size: i64,

    #[validate(length(max = 255, message = "MIME type must be at most 255 characters"))]
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAttachmentRequest {
    #[validate(length(min = 1, max = 255, message = "Filename must be 1-255 characters"))]
    pub filename: Option<String>,

    /// `null` clears the MIME type
    #[serde(default, deserialize_with = "nullable")]
    pub mime_type: Option<Option<String>>,
}

fn attachment_not_found() -> ApiError {
    ApiError::NotFound("Attachment not found".to_string())
}

pub async fn list_attachments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Page<Attachment>>> {
    authorize(&state.db, auth.user_id, Resource::Task(task_id), ResourcePermission::Read).await?;

    Ok(Json(Attachment::list_by_task(&state.db, task_id, query.page()).await?))
}

/// Register an attachment
///
/// # Endpoint
///
/// ```text
/// POST /v1/tasks/:id/attachments
/// Content-Type: application/json
///
/// {
///   "filename": "mockup.png",
///   "file_url": "https://files.example.com/abc/mockup.png",
///   "file_size": 48213,
///   "mime_type": "image/png"
/// }
/// ```
pub async fn create_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(task_id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateAttachmentRequest>,
) -> ApiResult<Created<Attachment>> {
    let filename = required_text("filename", &req.filename)?;

    authorize(&state.db, auth.user_id, Resource::Task(task_id), ResourcePermission::Write).await?;

    let attachment = Attachment::create(
        &state.db,
        CreateAttachment {
            task_id,
            uploaded_by: auth.user_id,
            filename,
            file_url: req.file_url,
            file_size: req.file_size,
            mime_type: req.mime_type,
        },
    )
    .await?;

    tracing::debug!(attachment_id = %attachment.id, task_id = %task_id, "Attachment registered");
    Ok(created(attachment))
}

pub async fn get_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Attachment>> {
    authorize(&state.db, auth.user_id, Resource::Attachment(id), ResourcePermission::Read).await?;

    let attachment = Attachment::find_by_id(&state.db, id)
        .await?
        .ok_or_else(attachment_not_found)?;

    Ok(Json(attachment))
}

pub async fn update_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateAttachmentRequest>,
) -> ApiResult<Json<Attachment>> {
    validate_nullable_len("mime_type", &req.mime_type, 255)?;

    authorize(&state.db, auth.user_id, Resource::Attachment(id), ResourcePermission::Write).await?;

    let update = UpdateAttachment {
        filename: req.filename.as_deref().map(|f| required_text("filename", f)).transpose()?,
        mime_type: req.mime_type,
    };

    let attachment = Attachment::update(&state.db, id, update)
        .await?
        .ok_or_else(attachment_not_found)?;

    Ok(Json(attachment))
}

pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    authorize(&state.db, auth.user_id, Resource::Attachment(id), ResourcePermission::Write).await?;

    if !Attachment::delete(&state.db, id).await? {
        return Err(attachment_not_found());
    }

    Ok(DeleteResponse::new(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(file_url: &str, file_size: i64) -> CreateAttachmentRequest {
        CreateAttachmentRequest {
            filename: "brief.pdf".to_string(),
            file_url: file_url.to_string(),
            file_size,
            mime_type: Some("application/pdf".to_string()),
        }
    }

    #[test]
    fn test_valid_attachment() {
        assert!(request("https://files.example.com/brief.pdf", 0).validate().is_ok());
    }

    #[test]
    fn test_negative_size_rejected() {
        let errors = request("https://files.example.com/brief.pdf", -1)
            .validate()
            .unwrap_err();
        assert!(errors.field_errors().contains_key("file_size"));
    }

    #[test]
    fn test_bad_url_rejected() {
        let errors = request("not a url", 10).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("file_url"));
    }

    #[test]
    fn test_overlong_url_rejected() {
        let url = format!("https://files.example.com/{}", "a".repeat(2048));
        let errors = request(&url, 10).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("file_url"));

        let url = format!("https://files.example.com/{}", "a".repeat(2000));
        assert!(request(&url, 10).validate().is_ok());
    }
}
