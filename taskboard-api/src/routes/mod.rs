/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login and token refresh
/// - `profiles`: User profiles
/// - `projects`: Projects and per-project stats
/// - `members`: Project membership management
/// - `tasks`: Tasks and their tag links
/// - `subtasks`, `comments`, `attachments`: Task children
/// - `tags`: Global tag vocabulary
/// - `dashboard`: Cross-project summary
///
/// Project-scoped handlers authorize through
/// [`taskboard_shared::auth::authorization::authorize`] before touching data.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::pagination::PageParams;
use uuid::Uuid;

pub mod attachments;
pub mod auth;
pub mod comments;
pub mod dashboard;
pub mod health;
pub mod members;
pub mod profiles;
pub mod projects;
pub mod subtasks;
pub mod tags;
pub mod tasks;

/// Response for a `201 Created`
pub type Created<T> = (StatusCode, Json<T>);

pub(crate) fn created<T>(value: T) -> Created<T> {
    (StatusCode::CREATED, Json(value))
}

/// Body returned by every delete endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub id: Uuid,
    pub deleted: bool,
}

impl DeleteResponse {
    pub fn new(id: Uuid) -> Json<Self> {
        Json(Self { id, deleted: true })
    }
}

/// `?limit=&offset=&search=` for simple lists
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> PageParams {
        PageParams::new(self.limit, self.offset)
    }
}
