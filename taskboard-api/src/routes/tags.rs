/// Tag endpoints
///
/// Tags are a global vocabulary shared by every project; any authenticated
/// caller may manage them. Deleting a tag unlinks it from all tasks.
///
/// # Endpoints
///
/// - `GET /v1/tags` - List tags alphabetically (`search`)
/// - `POST /v1/tags` - Create a tag
/// - `GET /v1/tags/:id` - Get a tag
/// - `PATCH /v1/tags/:id` - Rename or recolor a tag
/// - `DELETE /v1/tags/:id` - Delete a tag

use crate::{
    app::AppState,
    error::{required_text, validate_color, ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    routes::{created, Created, DeleteResponse, ListQuery},
};
use axum::{extract::State, Json};
use serde::Deserialize;
use taskboard_shared::{
    models::tag::{CreateTag, Tag, UpdateTag},
    pagination::Page,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,

    /// `#RRGGBB`
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTagRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: Option<String>,

    pub color: Option<String>,
}

fn tag_not_found() -> ApiError {
    ApiError::NotFound("Tag not found".to_string())
}

pub async fn list_tags(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Page<Tag>>> {
    Ok(Json(
        Tag::list(&state.db, query.search.as_deref(), query.page()).await?,
    ))
}

/// Create a tag
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Name already exists
pub async fn create_tag(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateTagRequest>,
) -> ApiResult<Created<Tag>> {
    if let Some(color) = req.color.as_deref() {
        validate_color("color", color)?;
    }

    let tag = Tag::create(
        &state.db,
        CreateTag {
            name: required_text("name", &req.name)?,
            color: req.color,
        },
    )
    .await?;

    Ok(created(tag))
}

pub async fn get_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Tag>> {
    let tag = Tag::find_by_id(&state.db, id)
        .await?
        .ok_or_else(tag_not_found)?;

    Ok(Json(tag))
}

pub async fn update_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateTagRequest>,
) -> ApiResult<Json<Tag>> {
    if let Some(color) = req.color.as_deref() {
        validate_color("color", color)?;
    }

    let update = UpdateTag {
        name: req.name.as_deref().map(|n| required_text("name", n)).transpose()?,
        color: req.color,
    };

    let tag = Tag::update(&state.db, id, update)
        .await?
        .ok_or_else(tag_not_found)?;

    Ok(Json(tag))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    if !Tag::delete(&state.db, id).await? {
        return Err(tag_not_found());
    }

    Ok(DeleteResponse::new(id))
}
