use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use skillspring::notify::Notifier;
use skillspring::routes::{self, AppState};

// connect_lazy never opens a connection; these tests only exercise paths
// that fail before any storage access.
fn test_app() -> Router {
    let db = sqlx::Pool::connect_lazy("postgres://localhost/skillspring_test")
        .expect("lazy pool");
    let state = AppState {
        db,
        notifier: Notifier::from_env(),
    };
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(routes::router(state))
}

fn json_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_always_up() {
    let app = test_app();
    let res = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn registration_rejects_blank_names_before_touching_storage() {
    let app = test_app();
    let res = app
        .oneshot(json_post(
            "/api/users",
            r#"{"name": "   ", "email": "ada@example.com"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn registration_rejects_implausible_emails() {
    let app = test_app();
    let res = app
        .oneshot(json_post(
            "/api/users",
            r#"{"name": "Ada", "email": "not-an-email"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn mutations_require_an_authenticated_principal() {
    let app = test_app();
    let res = app
        .oneshot(json_post("/api/courses", "{}"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn garbage_principal_ids_read_as_unauthenticated() {
    let app = test_app();
    let req = Request::builder()
        .method("POST")
        .uri("/api/courses/00000000-0000-0000-0000-000000000000/submit")
        .header("x-user-id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
