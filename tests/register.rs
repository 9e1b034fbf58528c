//! End-to-end checks of the registration flow through the real router.
//!
//! The router is driven in-process with `oneshot`; users live in a
//! `MemoryUserStore` so each test starts from an empty store.

use accounts::accounts::{
    forms::{MSG_DUPLICATE_USERNAME, MSG_PASSWORD_MISMATCH, MSG_REQUIRED},
    handlers::register::SUCCESS_URL,
    router,
    store::{MemoryUserStore, NewUser, User, UserStore},
    templates::Templates,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, LOCATION},
        Request, StatusCode,
    },
    response::Response,
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

fn app(store: Arc<MemoryUserStore>) -> Result<Router> {
    Ok(router(store, Arc::new(Templates::embedded()?)))
}

async fn post_form(app: Router, body: &str) -> Result<Response> {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(Body::from(body.to_string()))?,
        )
        .await?;
    Ok(response)
}

async fn body_text(response: Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

#[tokio::test]
async fn get_renders_empty_form() -> Result<()> {
    let store = Arc::new(MemoryUserStore::new());
    let response = app(store.clone())?
        .oneshot(Request::builder().uri("/register").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/html")));

    let html = body_text(response).await?;
    assert!(html.contains(r#"name="username""#));
    assert!(html.contains(r#"value="""#));
    assert!(!html.contains("errorlist"));
    assert!(store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn valid_submission_creates_user_and_redirects() -> Result<()> {
    let store = Arc::new(MemoryUserStore::new());
    let response = post_form(
        app(store.clone())?,
        "username=alice&password1=s3cure-pass&password2=s3cure-pass",
    )
    .await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok()),
        Some(SUCCESS_URL)
    );
    assert_eq!(SUCCESS_URL, "/login");

    assert_eq!(store.len().await, 1);
    let user = store
        .find("alice")
        .await
        .ok_or_else(|| anyhow!("alice was not stored"))?;
    assert!(user.password.starts_with("$argon2id$"));
    Ok(())
}

#[tokio::test]
async fn empty_username_rerenders_with_required_error() -> Result<()> {
    let store = Arc::new(MemoryUserStore::new());
    let response = post_form(
        app(store.clone())?,
        "username=&password1=s3cure-pass&password2=s3cure-pass",
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await?;
    assert!(html.contains(r#"id="error_username""#));
    assert!(html.contains(MSG_REQUIRED));
    assert!(!html.contains("error_password"));
    assert!(store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn invalid_submission_keeps_username_but_not_passwords() -> Result<()> {
    let store = Arc::new(MemoryUserStore::new());
    let response = post_form(
        app(store.clone())?,
        "username=bob&password1=hunter2hunter2&password2=different-pass",
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await?;
    assert!(html.contains(r#"value="bob""#));
    assert!(html.contains(r#"id="error_password2""#));
    assert!(html.contains(MSG_PASSWORD_MISMATCH));
    assert!(!html.contains("hunter2hunter2"));
    assert!(!html.contains("different-pass"));
    assert!(store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn missing_fields_are_required() -> Result<()> {
    let store = Arc::new(MemoryUserStore::new());
    let response = post_form(app(store.clone())?, "").await?;

    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await?;
    assert!(html.contains(r#"id="error_username""#));
    assert!(html.contains(r#"id="error_password1""#));
    assert!(html.contains(r#"id="error_password2""#));
    assert!(store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn body_without_content_type_is_an_empty_form() -> Result<()> {
    let store = Arc::new(MemoryUserStore::new());
    let response = app(store.clone())?
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/register")
                .body(Body::from(
                    "username=erin&password1=s3cure-pass&password2=s3cure-pass",
                ))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await?;
    assert!(html.contains(r#"id="error_username""#));
    assert!(html.contains(r#"id="error_password1""#));
    assert!(html.contains(r#"id="error_password2""#));
    assert!(html.contains(MSG_REQUIRED));
    assert!(store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn repeated_field_uses_last_value() -> Result<()> {
    let store = Arc::new(MemoryUserStore::new());
    let response = post_form(
        app(store.clone())?,
        "username=a&username=frank1&password1=s3cure-pass&password2=s3cure-pass",
    )
    .await?;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(store.find("frank1").await.is_some());
    assert!(store.find("a").await.is_none());
    Ok(())
}

#[tokio::test]
async fn repeated_submission_is_rejected_as_duplicate() -> Result<()> {
    let store = Arc::new(MemoryUserStore::new());
    let app = app(store.clone())?;
    let body = "username=carol&password1=s3cure-pass&password2=s3cure-pass";

    let first = post_form(app.clone(), body).await?;
    assert_eq!(first.status(), StatusCode::FOUND);

    let second = post_form(app, body).await?;
    assert_eq!(second.status(), StatusCode::OK);

    let html = body_text(second).await?;
    assert!(html.contains(MSG_DUPLICATE_USERNAME));
    assert_eq!(store.len().await, 1);
    Ok(())
}

#[tokio::test]
async fn username_is_html_escaped() -> Result<()> {
    let store = Arc::new(MemoryUserStore::new());
    let response = post_form(
        app(store)?,
        "username=%3Cb%3Ex%3C%2Fb%3E&password1=s3cure-pass&password2=s3cure-pass",
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await?;
    assert!(html.contains("&lt;b&gt;x&lt;"));
    assert!(!html.contains("<b>x</b>"));
    Ok(())
}

/// Store whose writes always fail, to exercise the error path.
#[derive(Debug)]
struct FailingStore;

#[async_trait]
impl UserStore for FailingStore {
    async fn username_exists(&self, _username: &str) -> Result<bool> {
        Ok(false)
    }

    async fn create_user(&self, _new_user: NewUser) -> Result<User> {
        Err(anyhow!("connection reset"))
    }

    async fn ping(&self) -> Result<()> {
        Err(anyhow!("connection reset"))
    }
}

#[tokio::test]
async fn store_failure_is_a_server_error() -> Result<()> {
    let app = router(Arc::new(FailingStore), Arc::new(Templates::embedded()?));
    let response = post_form(
        app,
        "username=dave&password1=s3cure-pass&password2=s3cure-pass",
    )
    .await?;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_text(response).await?;
    assert!(!body.contains("connection reset"));
    Ok(())
}

#[tokio::test]
async fn health_reports_store_status() -> Result<()> {
    let healthy = app(Arc::new(MemoryUserStore::new()))?
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(healthy.status(), StatusCode::OK);
    assert!(healthy.headers().contains_key("x-app"));

    let json: serde_json::Value = serde_json::from_str(&body_text(healthy).await?)?;
    assert_eq!(json["store"], "ok");
    assert_eq!(json["name"], env!("CARGO_PKG_NAME"));

    let unhealthy = router(Arc::new(FailingStore), Arc::new(Templates::embedded()?))
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(unhealthy.status(), StatusCode::SERVICE_UNAVAILABLE);
    Ok(())
}

#[tokio::test]
async fn request_id_is_propagated() -> Result<()> {
    let response = app(Arc::new(MemoryUserStore::new()))?
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok()),
        Some("req-123")
    );
    Ok(())
}
