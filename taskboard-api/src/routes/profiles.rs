/// Profile endpoints
///
/// # Endpoints
///
/// - `GET /v1/profiles` - List profiles (`search`, `limit`, `offset`)
/// - `GET /v1/profiles/me` - The caller's profile
/// - `GET /v1/profiles/:id` - Get a profile
/// - `PATCH /v1/profiles/:id` - Update own profile
/// - `DELETE /v1/profiles/:id` - Delete own profile
///
/// Any authenticated caller may read profiles (to find people to add to a
/// project); only the profile's owner may change or delete it.

use crate::{
    app::AppState,
    error::{validate_nullable_len, ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    routes::{DeleteResponse, ListQuery},
};
use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use taskboard_shared::{
    auth::{authorization::require_self, middleware::AuthContext, password},
    models::{
        nullable,
        profile::{Profile, ProfileFilter, UpdateProfile},
    },
    pagination::Page,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// New password; checked against the strength rules
    pub password: Option<String>,

    /// `null` clears the name
    #[serde(default, deserialize_with = "nullable")]
    pub full_name: Option<Option<String>>,

    /// `null` clears the avatar
    #[serde(default, deserialize_with = "nullable")]
    pub avatar_url: Option<Option<String>>,
}

async fn find_profile(state: &AppState, id: Uuid) -> ApiResult<Profile> {
    Profile::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))
}

/// List profiles, ordered by email
pub async fn list_profiles(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Page<Profile>>> {
    let filter = ProfileFilter {
        search: query.search.clone(),
    };

    Ok(Json(Profile::list(&state.db, &filter, query.page()).await?))
}

/// Get the authenticated caller's profile
///
/// # Errors
///
/// - `404 Not Found`: The caller's profile was deleted after the token was issued
pub async fn get_current_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Profile>> {
    Ok(Json(find_profile(&state, auth.user_id).await?))
}

pub async fn get_profile(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Profile>> {
    Ok(Json(find_profile(&state, id).await?))
}

/// Update own profile
///
/// # Endpoint
///
/// ```text
/// PATCH /v1/profiles/:id
/// Content-Type: application/json
///
/// { "full_name": "Ada King", "avatar_url": null }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or new password too weak
/// - `403 Forbidden`: Not the caller's profile
/// - `404 Not Found`: No such profile
/// - `409 Conflict`: Email already taken
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> ApiResult<Json<Profile>> {
    validate_nullable_len("full_name", &req.full_name, 255)?;
    validate_nullable_len("avatar_url", &req.avatar_url, 512)?;

    if !Profile::exists(&state.db, id).await? {
        return Err(ApiError::NotFound("Profile not found".to_string()));
    }
    require_self(auth.user_id, id)?;

    let password_hash = match req.password.as_deref() {
        Some(new_password) => {
            password::validate_password_strength(new_password)
                .map_err(|message| ApiError::invalid_field("password", message))?;
            Some(password::hash_password(new_password)?)
        }
        None => None,
    };

    let update = UpdateProfile {
        email: req.email.map(|e| e.trim().to_string()),
        password_hash,
        full_name: req.full_name,
        avatar_url: req.avatar_url,
    };

    let profile = Profile::update(&state.db, id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

/// Delete own profile
///
/// # Errors
///
/// - `403 Forbidden`: Not the caller's profile
/// - `404 Not Found`: No such profile
/// - `409 Conflict`: The profile still owns projects
pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    if !Profile::exists(&state.db, id).await? {
        return Err(ApiError::NotFound("Profile not found".to_string()));
    }
    require_self(auth.user_id, id)?;

    if !Profile::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Profile not found".to_string()));
    }

    tracing::info!(user_id = %id, "Profile deleted");
    Ok(DeleteResponse::new(id))
}
