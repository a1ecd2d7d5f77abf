/// Router tests that never reach the database
///
/// The router runs over a pool pointed at a closed port, so these cover
/// authentication, request validation, error shape and response headers.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{lazy_app, send, TEST_SECRET};
use serde_json::json;
use taskboard_shared::auth::jwt::{self, Claims, TokenType};
use tower::ServiceExt;
use uuid::Uuid;

fn access_token() -> String {
    let (access, _) = jwt::issue_token_pair(Uuid::new_v4(), TEST_SECRET).unwrap();
    access
}

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let (status, body) = send(&lazy_app(), Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = lazy_app();

    for (method, uri) in [
        (Method::GET, "/v1/profiles/me"),
        (Method::GET, "/v1/projects"),
        (Method::POST, "/v1/projects"),
        (Method::GET, "/v1/tasks"),
        (Method::GET, "/v1/tags"),
        (Method::DELETE, "/v1/comments/00000000-0000-0000-0000-000000000000"),
        (Method::GET, "/v1/dashboard/summary"),
    ] {
        let (status, body) = send(&app, method.clone(), uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_non_bearer_scheme_rejected() {
    let request = Request::builder()
        .uri("/v1/projects")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();

    let response = lazy_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_garbage_and_foreign_tokens_rejected() {
    let app = lazy_app();

    let (status, _) = send(&app, Method::GET, "/v1/projects", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (foreign, _) =
        jwt::issue_token_pair(Uuid::new_v4(), "some-other-secret-that-is-32-bytes-long").unwrap();
    let (status, _) = send(&app, Method::GET, "/v1/projects", Some(&foreign), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let (_, refresh) = jwt::issue_token_pair(Uuid::new_v4(), TEST_SECRET).unwrap();

    let (status, _) = send(&lazy_app(), Method::GET, "/v1/projects", Some(&refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let claims = Claims::with_expiration(
        Uuid::new_v4(),
        TokenType::Access,
        chrono::Duration::seconds(-120),
    );
    let token = jwt::create_token(&claims, TEST_SECRET).unwrap();

    let (status, _) = send(&lazy_app(), Method::GET, "/v1/projects", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_endpoint_rejects_access_token() {
    let (status, body) = send(
        &lazy_app(),
        Method::POST,
        "/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": access_token() })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_register_validation_errors() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/register",
        None,
        Some(json!({ "email": "not-an-email", "password": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));

    let (status, body) = send(
        &app,
        Method::POST,
        "/v1/auth/register",
        None,
        Some(json!({ "email": "ada@example.com", "password": "alllowercase" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/v1/projects")
        .header(header::AUTHORIZATION, format!("Bearer {}", access_token()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();

    let response = lazy_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_create_payloads_validated_before_database() {
    let app = lazy_app();
    let token = access_token();
    let task_id = Uuid::new_v4();

    let cases = [
        ("/v1/projects".to_string(), json!({ "name": "" })),
        ("/v1/projects".to_string(), json!({ "name": "   " })),
        ("/v1/projects".to_string(), json!({ "name": "Site", "color": "blue" })),
        ("/v1/tags".to_string(), json!({ "name": "bug", "color": "#12345" })),
        (
            "/v1/tasks".to_string(),
            json!({ "project_id": Uuid::new_v4(), "title": "" }),
        ),
        (
            format!("/v1/tasks/{}/attachments", task_id),
            json!({ "filename": "a.txt", "file_url": "https://x.example/a.txt", "file_size": -1 }),
        ),
        (
            format!("/v1/tasks/{}/attachments", task_id),
            json!({ "filename": "a.txt", "file_url": "nope", "file_size": 1 }),
        ),
        (format!("/v1/tasks/{}/comments", task_id), json!({ "content": "" })),
        (format!("/v1/tasks/{}/subtasks", task_id), json!({ "title": "" })),
    ];

    for (uri, payload) in cases {
        let (status, body) =
            send(&app, Method::POST, &uri, Some(&token), Some(payload.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", uri, payload);
        assert_eq!(body["error"], "validation_error", "{} {}", uri, payload);
    }
}

#[tokio::test]
async fn test_values_longer_than_columns_are_validation_errors() {
    let app = lazy_app();
    let token = access_token();
    let task_id = Uuid::new_v4();
    let long_title = "x".repeat(300);
    let long_url = format!("https://files.example.com/{}", "a".repeat(2100));

    let cases = [
        (
            Method::POST,
            "/v1/tasks".to_string(),
            json!({ "project_id": Uuid::new_v4(), "title": long_title }),
            "title",
        ),
        (
            Method::PATCH,
            format!("/v1/tasks/{}", task_id),
            json!({ "title": long_title }),
            "title",
        ),
        (
            Method::POST,
            format!("/v1/tasks/{}/subtasks", task_id),
            json!({ "title": long_title }),
            "title",
        ),
        (
            Method::PATCH,
            format!("/v1/subtasks/{}", Uuid::new_v4()),
            json!({ "title": long_title }),
            "title",
        ),
        (
            Method::POST,
            format!("/v1/tasks/{}/attachments", task_id),
            json!({ "filename": "a.txt", "file_url": long_url, "file_size": 1 }),
            "file_url",
        ),
    ];

    for (method, uri, payload, field) in cases {
        let (status, body) = send(&app, method.clone(), &uri, Some(&token), Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", method, uri);
        assert_eq!(body["error"], "validation_error", "{} {}", method, uri);
        assert_eq!(body["details"][0]["field"], field, "{} {}", method, uri);
    }
}

#[tokio::test]
async fn test_unknown_enum_is_bad_request() {
    let (status, body) = send(
        &lazy_app(),
        Method::GET,
        "/v1/tasks?status=blocked",
        Some(&access_token()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_inverted_due_range_rejected() {
    let (status, body) = send(
        &lazy_app(),
        Method::GET,
        "/v1/tasks?due_from=2025-03-01&due_to=2025-02-01",
        Some(&access_token()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "due_from");
}

#[tokio::test]
async fn test_invalid_path_id_is_bad_request() {
    let (status, body) = send(
        &lazy_app(),
        Method::GET,
        "/v1/projects/not-a-uuid",
        Some(&access_token()),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_unknown_member_role_is_bad_request() {
    let (status, body) = send(
        &lazy_app(),
        Method::POST,
        &format!("/v1/projects/{}/members", Uuid::new_v4()),
        Some(&access_token()),
        Some(json!({ "user_id": Uuid::new_v4(), "role": "superuser" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_granting_owner_is_rejected_for_any_caller() {
    let (status, body) = send(
        &lazy_app(),
        Method::POST,
        &format!("/v1/projects/{}/members", Uuid::new_v4()),
        Some(&access_token()),
        Some(json!({ "user_id": Uuid::new_v4(), "role": "owner" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "owner_role_immutable");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (status, body) = send(&lazy_app(), Method::GET, "/v2/nothing", None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let app = lazy_app();

    for uri in ["/health", "/v1/projects", "/missing"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let headers = response.headers();

        assert_eq!(headers["x-content-type-options"], "nosniff", "{}", uri);
        assert_eq!(headers["x-frame-options"], "DENY", "{}", uri);
        assert_eq!(headers["cache-control"], "no-store", "{}", uri);
        assert!(!headers.contains_key("strict-transport-security"), "{}", uri);
    }
}

#[tokio::test]
async fn test_cors_preflight_allowed() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/v1/projects")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
        .body(Body::empty())
        .unwrap();

    let response = lazy_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}
