/// Request extractors that reject with [`ApiError`]
///
/// Axum's own `Json` and `Query` extractors answer malformed input with
/// plain-text 400/415/422 responses. These wrappers keep every client error
/// in the JSON error format with a 400 status.
///
/// - [`ValidatedJson`]: JSON body, then `validator::Validate`
/// - [`ApiQuery`]: query string
/// - [`ApiPath`]: path parameters

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ApiError;

/// JSON body that has passed validation
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| ApiError::BadRequest(rejection.body_text()))?;

        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Query string parameters
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| ApiError::BadRequest(rejection.body_text()))?;

        Ok(ApiQuery(value))
    }
}

/// Path parameters; a malformed id is a 400 like any other bad input
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: PathRejection| ApiError::BadRequest(rejection.body_text()))?;

        Ok(ApiPath(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::StatusCode,
        routing::{get, post},
        Router,
    };
    use serde::Deserialize;
    use tower::ServiceExt;
    use uuid::Uuid;
    use validator::Validate;

    #[derive(Debug, Deserialize, Validate)]
    struct Named {
        #[validate(length(min = 1))]
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct Paging {
        limit: Option<i64>,
    }

    fn router() -> Router {
        Router::new()
            .route(
                "/named",
                post(|ValidatedJson(body): ValidatedJson<Named>| async move { body.name }),
            )
            .route(
                "/paged",
                get(|ApiQuery(q): ApiQuery<Paging>| async move { q.limit.unwrap_or(0).to_string() }),
            )
            .route(
                "/items/:id",
                get(|ApiPath(id): ApiPath<Uuid>| async move { id.to_string() }),
            )
    }

    async fn status_of(request: Request) -> StatusCode {
        router().oneshot(request).await.unwrap().status()
    }

    fn json_post(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/named")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn get_uri(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_json_passes() {
        assert_eq!(status_of(json_post(r#"{"name":"ok"}"#)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        assert_eq!(status_of(json_post("{not json")).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_failed_validation_is_400() {
        assert_eq!(status_of(json_post(r#"{"name":""}"#)).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_400() {
        let request = Request::builder()
            .method("POST")
            .uri("/named")
            .body(Body::from(r#"{"name":"ok"}"#))
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_query_is_400() {
        assert_eq!(status_of(get_uri("/paged?limit=ten")).await, StatusCode::BAD_REQUEST);
        assert_eq!(status_of(get_uri("/paged?limit=10")).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_path_id_is_400() {
        assert_eq!(status_of(get_uri("/items/not-a-uuid")).await, StatusCode::BAD_REQUEST);
        let uri = format!("/items/{}", Uuid::new_v4());
        assert_eq!(status_of(get_uri(&uri)).await, StatusCode::OK);
    }
}
