/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use taskboard_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use taskboard_shared::auth::middleware::{jwt_auth_middleware, AuthError};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler through Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                              (public)
/// └── /v1/
///     ├── /auth/{register,login,refresh}       (public)
///     ├── /profiles, /profiles/me, /profiles/:id
///     ├── /projects, /projects/:id, /projects/:id/stats
///     ├── /projects/:id/members, /projects/:id/members/:user_id
///     ├── /tasks, /tasks/:id
///     ├── /tasks/:id/{subtasks,comments,attachments,tags}
///     ├── /tasks/:id/tags/:tag_id
///     ├── /subtasks/:id, /comments/:id, /attachments/:id
///     ├── /tags, /tags/:id
///     └── /dashboard/summary
/// ```
///
/// Everything under `/v1` except `/v1/auth` requires a bearer access token.
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, request tracing, gzip/brotli
/// compression, then authentication on the protected routes only. Unknown paths get a JSON 404.
pub fn build_router(state: AppState) -> Router {
    use crate::routes::{
        attachments, auth, comments, dashboard, health, members, profiles, projects, subtasks,
        tags, tasks,
    };

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh));

    let protected_routes = Router::new()
        .route("/profiles", get(profiles::list_profiles))
        .route("/profiles/me", get(profiles::get_current_profile))
        .route(
            "/profiles/:id",
            get(profiles::get_profile)
                .patch(profiles::update_profile)
                .delete(profiles::delete_profile),
        )
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/:id",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/:id/stats", get(projects::get_project_stats))
        .route(
            "/projects/:id/members",
            get(members::list_members).post(members::add_member),
        )
        .route(
            "/projects/:id/members/:user_id",
            get(members::get_member)
                .patch(members::update_member_role)
                .delete(members::remove_member),
        )
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/:id",
            get(tasks::get_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route(
            "/tasks/:id/subtasks",
            get(subtasks::list_subtasks).post(subtasks::create_subtask),
        )
        .route(
            "/tasks/:id/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/tasks/:id/attachments",
            get(attachments::list_attachments).post(attachments::create_attachment),
        )
        .route(
            "/tasks/:id/tags",
            get(tasks::list_task_tags).post(tasks::attach_tag),
        )
        .route("/tasks/:id/tags/:tag_id", delete(tasks::detach_tag))
        .route(
            "/subtasks/:id",
            get(subtasks::get_subtask)
                .patch(subtasks::update_subtask)
                .delete(subtasks::delete_subtask),
        )
        .route(
            "/comments/:id",
            get(comments::get_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route(
            "/attachments/:id",
            get(attachments::get_attachment)
                .patch(attachments::update_attachment)
                .delete(attachments::delete_attachment),
        )
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route(
            "/tags/:id",
            get(tags::get_tag)
                .patch(tags::update_tag)
                .delete(tags::delete_tag),
        )
        .route("/dashboard/summary", get(dashboard::get_summary))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/v1", v1_routes)
        .fallback(not_found)
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Permissive when no origins are configured, otherwise an explicit allow-list
fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Authenticates the request and injects the `AuthContext`
async fn jwt_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    jwt_auth_middleware(state.jwt_secret(), req, next).await
}

async fn not_found() -> ApiError {
    ApiError::NotFound("No such route".to_string())
}
