/// Task endpoints
///
/// # Endpoints
///
/// - `GET /v1/tasks` - Tasks across the caller's projects, filterable
/// - `POST /v1/tasks` - Create a task, optionally with tags (member+)
/// - `GET /v1/tasks/:id` - Get a task with its tags (viewer+)
/// - `PATCH /v1/tasks/:id` - Update a task (member+)
/// - `DELETE /v1/tasks/:id` - Delete a task (member+)
/// - `GET /v1/tasks/:id/tags` - Tags on a task (viewer+)
/// - `POST /v1/tasks/:id/tags` - Attach a tag (member+)
/// - `DELETE /v1/tasks/:id/tags/:tag_id` - Detach a tag (member+)
///
/// # Filtering
///
/// `GET /v1/tasks` accepts `project_id`, `status`, `priority`,
/// `assignee_id`, `search` (title or description), `due_from` and `due_to`
/// (inclusive `YYYY-MM-DD`), plus `limit`/`offset`.

use std::collections::HashSet;

use crate::{
    app::AppState,
    error::{required_text, validate_nullable_len, ApiError, ApiResult},
    extract::{ApiPath, ApiQuery, ValidatedJson},
    routes::{created, Created, DeleteResponse},
};
use axum::{extract::State, Extension, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::{
        authorization::{authorize, Resource, ResourcePermission},
        middleware::AuthContext,
    },
    models::{
        nullable,
        profile::Profile,
        tag::{Tag, TaskTag},
        task::{CreateTask, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask},
    },
    pagination::{Page, PageParams},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub project_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    pub search: Option<String>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub project_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: Option<String>,

    /// Defaults to `todo`
    #[serde(default)]
    pub status: TaskStatus,

    /// Defaults to `medium`
    #[serde(default)]
    pub priority: TaskPriority,

    pub assignee_id: Option<Uuid>,

    pub due_date: Option<NaiveDate>,

    /// Tags linked in the same transaction as the insert
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    /// `null` unassigns
    #[serde(default, deserialize_with = "nullable")]
    pub assignee_id: Option<Option<Uuid>>,

    /// `null` clears the due date
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<NaiveDate>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AttachTagRequest {
    pub tag_id: Uuid,
}

/// Task with its tags
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,

    pub tags: Vec<Tag>,
}

impl TaskResponse {
    async fn load(state: &AppState, task: Task) -> ApiResult<Self> {
        let tags = Tag::list_for_task(&state.db, task.id).await?;
        Ok(Self { task, tags })
    }
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

async fn ensure_assignee_exists(state: &AppState, assignee_id: Uuid) -> ApiResult<()> {
    if Profile::exists(&state.db, assignee_id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound("Assignee not found".to_string()))
    }
}

/// Removes repeated ids, keeping first occurrences in order
fn dedup_ids(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// List tasks visible to the caller
///
/// With `project_id`, a missing project answers 404 and a project the
/// caller doesn't belong to answers 403; without it, results span every
/// project the caller is a member of.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<TaskListQuery>,
) -> ApiResult<Json<Page<Task>>> {
    if let Some(project_id) = query.project_id {
        authorize(&state.db, auth.user_id, Resource::Project(project_id), ResourcePermission::Read).await?;
    }

    if let (Some(from), Some(to)) = (query.due_from, query.due_to) {
        if from > to {
            return Err(ApiError::invalid_field("due_from", "due_from must not be after due_to"));
        }
    }

    let filter = TaskFilter {
        project_id: query.project_id,
        status: query.status,
        priority: query.priority,
        assignee_id: query.assignee_id,
        search: query.search,
        due_from: query.due_from,
        due_to: query.due_to,
        ..TaskFilter::visible_to(auth.user_id)
    };
    let page = PageParams::new(query.limit, query.offset);

    Ok(Json(Task::list(&state.db, &filter, page).await?))
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /v1/tasks
/// Content-Type: application/json
///
/// {
///   "project_id": "uuid",
///   "title": "Draft release notes",
///   "priority": "high",
///   "due_date": "2025-03-01",
///   "tag_ids": ["uuid"]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Viewer or not a member
/// - `404 Not Found`: No such project, assignee or tag
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateTaskRequest>,
) -> ApiResult<Created<TaskResponse>> {
    let title = required_text("title", &req.title)?;

    authorize(&state.db, auth.user_id, Resource::Project(req.project_id), ResourcePermission::Write).await?;

    if let Some(assignee_id) = req.assignee_id {
        ensure_assignee_exists(&state, assignee_id).await?;
    }

    let tag_ids = dedup_ids(req.tag_ids);
    for tag_id in &tag_ids {
        if Tag::find_by_id(&state.db, *tag_id).await?.is_none() {
            return Err(ApiError::NotFound(format!("Tag {} not found", tag_id)));
        }
    }

    let task = Task::create_with_tags(
        &state.db,
        CreateTask {
            project_id: req.project_id,
            creator_id: auth.user_id,
            assignee_id: req.assignee_id,
            title,
            description: req.description,
            status: req.status,
            priority: req.priority,
            due_date: req.due_date,
        },
        tag_ids,
    )
    .await?;

    tracing::info!(
        task_id = %task.id,
        project_id = %task.project_id,
        user_id = %auth.user_id,
        "Task created"
    );

    Ok(created(TaskResponse::load(&state, task).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    authorize(&state.db, auth.user_id, Resource::Task(id), ResourcePermission::Read).await?;

    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(Json(TaskResponse::load(&state, task).await?))
}

/// Update a task
///
/// Setting `status` to `done` stamps `completed_at`; leaving `done` clears it.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Viewer or not a member
/// - `404 Not Found`: No such task, or `assignee_id` names no profile (the
///   task is left unchanged)
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    validate_nullable_len("description", &req.description, 10000)?;

    authorize(&state.db, auth.user_id, Resource::Task(id), ResourcePermission::Write).await?;

    if let Some(Some(assignee_id)) = req.assignee_id {
        ensure_assignee_exists(&state, assignee_id).await?;
    }

    let update = UpdateTask {
        title: req.title.as_deref().map(|t| required_text("title", t)).transpose()?,
        description: req.description,
        status: req.status,
        priority: req.priority,
        assignee_id: req.assignee_id,
        due_date: req.due_date,
    };

    let task = Task::update(&state.db, id, update)
        .await?
        .ok_or_else(task_not_found)?;

    Ok(Json(TaskResponse::load(&state, task).await?))
}

/// Delete a task with its subtasks, comments, attachments and tag links
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeleteResponse>> {
    authorize(&state.db, auth.user_id, Resource::Task(id), ResourcePermission::Write).await?;

    if !Task::delete(&state.db, id).await? {
        return Err(task_not_found());
    }

    tracing::info!(task_id = %id, user_id = %auth.user_id, "Task deleted");
    Ok(DeleteResponse::new(id))
}

pub async fn list_task_tags(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Vec<Tag>>> {
    authorize(&state.db, auth.user_id, Resource::Task(id), ResourcePermission::Read).await?;

    Ok(Json(Tag::list_for_task(&state.db, id).await?))
}

/// Attach a tag to a task
///
/// # Errors
///
/// - `404 Not Found`: No such task or tag
/// - `409 Conflict`: Already attached
pub async fn attach_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ValidatedJson(req): ValidatedJson<AttachTagRequest>,
) -> ApiResult<Created<TaskTag>> {
    authorize(&state.db, auth.user_id, Resource::Task(id), ResourcePermission::Write).await?;

    if Tag::find_by_id(&state.db, req.tag_id).await?.is_none() {
        return Err(ApiError::NotFound("Tag not found".to_string()));
    }

    let link = Tag::attach(&state.db, id, req.tag_id).await?;
    Ok(created(link))
}

/// Detach a tag from a task
///
/// # Errors
///
/// - `404 Not Found`: No such task, or the tag isn't attached
pub async fn detach_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((id, tag_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<DeleteResponse>> {
    authorize(&state.db, auth.user_id, Resource::Task(id), ResourcePermission::Write).await?;

    if !Tag::detach(&state.db, id, tag_id).await? {
        return Err(ApiError::NotFound("Tag is not attached to this task".to_string()));
    }

    Ok(DeleteResponse::new(tag_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_ids_keeps_first_occurrence() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup_ids(vec![a, b, a, b, a]), vec![a, b]);
        assert!(dedup_ids(Vec::new()).is_empty());
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateTaskRequest = serde_json::from_value(serde_json::json!({
            "project_id": Uuid::nil(),
            "title": "Write tests"
        }))
        .unwrap();

        assert_eq!(req.status, TaskStatus::Todo);
        assert_eq!(req.priority, TaskPriority::Medium);
        assert!(req.tag_ids.is_empty());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_request_distinguishes_null_from_missing() {
        let req: UpdateTaskRequest =
            serde_json::from_value(serde_json::json!({ "assignee_id": null })).unwrap();
        assert_eq!(req.assignee_id, Some(None));
        assert_eq!(req.due_date, None);

        let req: UpdateTaskRequest =
            serde_json::from_value(serde_json::json!({ "due_date": "2025-03-01" })).unwrap();
        assert_eq!(req.due_date, Some(NaiveDate::from_ymd_opt(2025, 3, 1)));
        assert_eq!(req.assignee_id, None);
    }

    #[test]
    fn test_empty_title_rejected() {
        let req: CreateTaskRequest = serde_json::from_value(serde_json::json!({
            "project_id": Uuid::nil(),
            "title": ""
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }
}
