mod error;
mod posts;
mod users;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::rejection::JsonRejection,
    http::Uri,
    routing::{get, post},
    Json, Router,
};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

pub use error::ApiError;

use crate::model::{
    repository::{PostRepository, UserRepository},
    Context,
};

pub struct AppState {
    pub users: Box<dyn UserRepository>,
    pub posts: Box<dyn PostRepository>,
    /// Deadline given to the store work of each request.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        users: impl UserRepository + 'static,
        posts: impl PostRepository + 'static,
        request_timeout: Duration,
    ) -> AppState {
        AppState {
            users: Box::new(users),
            posts: Box::new(posts),
            request_timeout,
        }
    }

    /// A zero timeout means store work never times out.
    pub fn context(&self) -> Context {
        if self.request_timeout.is_zero() {
            Context::background()
        } else {
            Context::with_timeout(self.request_timeout)
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/users", get(users::get_all).post(users::create))
        .route("/api/v1/users/login", post(users::login))
        .route(
            "/api/v1/users/:id",
            get(users::get_one).put(users::update).delete(users::delete),
        )
        .route("/api/v1/posts", get(posts::get_all).post(posts::create))
        .route("/api/v1/posts/user/:user_id", get(posts::get_by_user))
        .route(
            "/api/v1/posts/:id",
            get(posts::get_one).put(posts::update).delete(posts::delete),
        )
        .with_state(state)
}

/// The router, accepting paths with or without a trailing slash.
pub fn app(state: Arc<AppState>) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

fn decode<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(value) = body?;
    Ok(value)
}

fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>()
        .map_err(|err| ApiError::BadRequest(format!("invalid id {raw:?}: {err}")))
}

/// Where a resource created by a POST to `uri` lives.
fn location(uri: &Uri, id: u64) -> String {
    format!("{}/{}", uri.path().trim_end_matches('/'), id)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{database::tests::SCHEMA, Database};
    use axum::{
        body::Body,
        http::{header, Request, Response, StatusCode},
    };
    use tower::ServiceExt;

    pub fn request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub async fn send(
        app: &NormalizePath<Router>,
        request: Request<Body>,
    ) -> Response<axum::body::BoxBody> {
        app.clone().oneshot(request).await.unwrap()
    }

    pub async fn body_text(response: Response<axum::body::BoxBody>) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub async fn body_json(response: Response<axum::body::BoxBody>) -> serde_json::Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    fn live_app() -> NormalizePath<Router> {
        let db = Database::open_in_memory(SCHEMA).unwrap();
        app(Arc::new(AppState::new(
            db.clone(),
            db,
            Duration::from_secs(5),
        )))
    }

    const DANIEL: &str = r#"{
        "first_name": "Daniel",
        "last_name": "De La Pava Suarez",
        "username": "daniel.delapava",
        "email": "daniel.delapava@jikkosoft.com",
        "password": "123456"
    }"#;

    #[test]
    fn zero_timeout_has_no_deadline() {
        let db = Database::open_in_memory(SCHEMA).unwrap();

        let state = AppState::new(db.clone(), db.clone(), Duration::ZERO);
        assert!(state.context().deadline().is_none());

        let state = AppState::new(db.clone(), db, Duration::from_secs(1));
        assert!(state.context().deadline().is_some());
    }

    #[test]
    fn location_joins_path_and_id() {
        let uri: Uri = "/api/v1/users/".parse().unwrap();
        assert_eq!(location(&uri, 3), "/api/v1/users/3");

        let uri: Uri = "/api/v1/posts?draft=true".parse().unwrap();
        assert_eq!(location(&uri, 10), "/api/v1/posts/10");
    }

    #[test]
    fn ids_must_be_unsigned() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(parse_id("-1").is_err());
        assert!(parse_id("one").is_err());
        assert!(parse_id("").is_err());
    }

    #[tokio::test]
    async fn user_lifecycle() {
        let app = live_app();

        let response = send(&app, request("GET", "/api/v1/users/", "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!([]));

        let response = send(&app, request("POST", "/api/v1/users/", DANIEL)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .to_string();
        let created = body_json(response).await;
        assert!(created.get("password").is_none());
        assert_eq!(created["picture"], "https://placekitten.com/g/300/300");
        let id = created["id"].as_u64().unwrap();
        assert_eq!(location, format!("/api/v1/users/{id}"));

        let response = send(&app, request("POST", "/api/v1/users/", DANIEL)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let no_username = r#"{"email": "anon@jikkosoft.com", "password": "123456"}"#;
        let response = send(&app, request("POST", "/api/v1/users/", no_username)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = send(&app, request("GET", &location, "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let loaded = body_json(response).await;
        assert_eq!(loaded["username"], "daniel.delapava");
        assert_eq!(loaded["created_at"], created["created_at"]);

        let response = send(&app, request("GET", "/api/v1/users/999", "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let changes = r#"{
            "first_name": "Dani",
            "username": "daniel.delapava",
            "email": "dani@jikkosoft.com",
            "password": "123456"
        }"#;
        let response = send(&app, request("PUT", &location, changes)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.is_empty());

        let response = send(&app, request("GET", &location, "")).await;
        let loaded = body_json(response).await;
        assert_eq!(loaded["first_name"], "Dani");
        assert_eq!(loaded["email"], "dani@jikkosoft.com");

        let login = r#"{
            "username": "daniel.delapava",
            "email": "dani@jikkosoft.com",
            "password": "123456"
        }"#;
        let response = send(&app, request("POST", "/api/v1/users/login", login)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, request("GET", &format!("/api/v1/posts/user/{id}"), "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, request("DELETE", &location, "")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, request("DELETE", &location, "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, request("GET", "/api/v1/users", "")).await;
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn ids_past_the_store_range_are_not_found() {
        let app = live_app();

        for (method, uri) in [
            ("GET", "/api/v1/users/18446744073709551615"),
            ("DELETE", "/api/v1/users/9223372036854775808"),
            ("GET", "/api/v1/posts/9223372036854775808"),
            ("GET", "/api/v1/posts/user/9223372036854775808"),
        ] {
            let response = send(&app, request(method, uri, "")).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{method} {uri}");
        }

        let body = r#"{"body": "edited"}"#;
        let response = send(&app, request("PUT", "/api/v1/posts/18446744073709551615", body)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn post_lifecycle() {
        let app = live_app();

        let response = send(&app, request("POST", "/api/v1/users", DANIEL)).await;
        let user_id = body_json(response).await["id"].as_u64().unwrap();

        let body = format!(r#"{{"body": "first post", "user_id": {user_id}}}"#);
        let response = send(&app, request("POST", "/api/v1/posts/", &body)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .to_string();
        let post_id = body_json(response).await["id"].as_u64().unwrap();
        assert_eq!(location, format!("/api/v1/posts/{post_id}"));

        let orphan = r#"{"body": "nobody wrote this", "user_id": 999}"#;
        let response = send(&app, request("POST", "/api/v1/posts", orphan)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, request("GET", &format!("/api/v1/posts/user/{user_id}"), "")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let posts = body_json(response).await;
        assert_eq!(posts.as_array().unwrap().len(), 1);
        assert_eq!(posts[0]["body"], "first post");

        // Users that still own posts cannot be removed.
        let response = send(&app, request("DELETE", &format!("/api/v1/users/{user_id}"), "")).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(&app, request("PUT", &location, r#"{"body": "edited"}"#)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, request("GET", &location, "")).await;
        assert_eq!(body_json(response).await["body"], "edited");

        let response = send(&app, request("PUT", "/api/v1/posts/999", r#"{"body": "x"}"#)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, request("DELETE", &location, "")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&app, request("GET", "/api/v1/posts", "")).await;
        assert_eq!(body_json(response).await, serde_json::json!([]));
    }
}
