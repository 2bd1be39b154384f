mod common;

use axum::http::StatusCode;
use axum::Router;
use migration::{Migrator, MigratorTrait};
use serde_json::json;

use attendance_api::config::{Config, Environment};
use attendance_api::live::session::SessionStore;
use attendance_api::live::ConnectionRegistry;
use attendance_api::state::AppState;

async fn test_app() -> Router {
    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .unwrap_or_default();
    Migrator::up(&db, None).await.unwrap_or_default();

    let state = AppState {
        db,
        config: Config {
            database_url: String::new(),
            server_host: std::net::IpAddr::from([127, 0, 0, 1]),
            server_port: 0,
            environment: Environment::Development,
            log_level: "warn".to_string(),
            jwt_secret: "test-secret-key-for-testing-only-32chars".to_string(),
            jwt_expiration_secs: 3600,
            frontend_url: "http://localhost:3001".to_string(),
        },
        sessions: SessionStore::new(),
        connections: ConnectionRegistry::new(),
    };

    attendance_api::routes::router().with_state(state)
}

// ──────────────────────────────────────────────────────────────────────────────
// POST /api/v1/auth/signup
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn signup_teacher_success() {
    let app = test_app().await;

    let (status, body) = common::post_json(
        &app,
        "/api/v1/auth/signup",
        &json!({
            "name": "Ms. Frizzle",
            "email": "frizzle@example.com",
            "password": "magicbus",
            "role": "teacher",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");

    let resp: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(resp["user"]["email"], "frizzle@example.com");
    assert_eq!(resp["user"]["role"], "teacher");
    assert!(!resp["token"].as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn signup_duplicate_email_conflicts() {
    let app = test_app().await;

    let payload = json!({
        "name": "First",
        "email": "dup@example.com",
        "password": "password",
        "role": "student",
    });
    let (status, _body) = common::post_json(&app, "/api/v1/auth/signup", &payload).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _body) = common::post_json(&app, "/api/v1/auth/signup", &payload).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn signup_rejects_unknown_role() {
    let app = test_app().await;

    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/signup",
        &json!({
            "name": "Nobody",
            "email": "nobody@example.com",
            "password": "password",
            "role": "admin",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signup_rejects_short_password() {
    let app = test_app().await;

    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/signup",
        &json!({
            "name": "Shorty",
            "email": "shorty@example.com",
            "password": "abc",
            "role": "student",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signup_rejects_invalid_email() {
    let app = test_app().await;

    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/signup",
        &json!({
            "name": "Bad Email",
            "email": "not-an-email",
            "password": "password",
            "role": "student",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ──────────────────────────────────────────────────────────────────────────────
// POST /api/v1/auth/signin
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn signin_success() {
    let app = test_app().await;

    common::post_json(
        &app,
        "/api/v1/auth/signup",
        &json!({
            "name": "Returning",
            "email": "return@example.com",
            "password": "password",
            "role": "student",
        }),
    )
    .await;

    let (status, body) = common::post_json(
        &app,
        "/api/v1/auth/signin",
        &json!({ "email": "return@example.com", "password": "password" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "signin failed: {body}");

    let resp: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert!(!resp["token"].as_str().unwrap_or_default().is_empty());
    assert_eq!(resp["user"]["role"], "student");
}

#[tokio::test]
async fn signin_wrong_password_unauthorized() {
    let app = test_app().await;

    common::post_json(
        &app,
        "/api/v1/auth/signup",
        &json!({
            "name": "Careful",
            "email": "careful@example.com",
            "password": "password",
            "role": "teacher",
        }),
    )
    .await;

    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/signin",
        &json!({ "email": "careful@example.com", "password": "wrong-password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signin_unknown_email_unauthorized() {
    let app = test_app().await;

    let (status, _body) = common::post_json(
        &app,
        "/api/v1/auth/signin",
        &json!({ "email": "ghost@example.com", "password": "password" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
