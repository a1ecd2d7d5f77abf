/// Dashboard endpoint
///
/// `GET /v1/dashboard/summary` returns task counts across every
/// non-archived project the caller belongs to.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::task::{DashboardSummary, Task},
};

/// # Response
///
/// ```json
/// {
///   "project_count": 3,
///   "total_tasks": 42,
///   "todo": 12, "in_progress": 8, "review": 4, "done": 18,
///   "low": 10, "medium": 20, "high": 9, "urgent": 3,
///   "overdue": 2,
///   "due_soon": 5,
///   "assigned_to_me": 7
/// }
/// ```
pub async fn get_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DashboardSummary>> {
    Ok(Json(Task::summary_for_user(&state.db, auth.user_id).await?))
}
