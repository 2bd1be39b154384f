mod common;

use axum::http::StatusCode;
use axum::Router;
use migration::{Migrator, MigratorTrait};
use serde_json::json;
use uuid::Uuid;

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

/// Sign up a user and return their token and id.
async fn signup(app: &Router, name: &str, email: &str, role: &str) -> (String, Uuid) {
    let (status, body) = common::post_json(
        app,
        "/api/v1/auth/signup",
        &json!({
            "name": name,
            "email": email,
            "password": "password",
            "role": role,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {body}");

    let resp: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    let token = resp["token"].as_str().unwrap_or_default().to_string();
    let id = resp["user"]["id"]
        .as_str()
        .unwrap_or_default()
        .parse()
        .unwrap_or_default();
    (token, id)
}

async fn create_class(app: &Router, teacher_token: &str, class_name: &str) -> Uuid {
    let (status, body) = common::post_json_with_auth(
        app,
        "/api/v1/classes",
        &json!({ "className": class_name }),
        teacher_token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create class failed: {body}");

    let resp: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    resp["id"]
        .as_str()
        .unwrap_or_default()
        .parse()
        .unwrap_or_default()
}

// ──────────────────────────────────────────────────────────────────────────────
// POST /api/v1/classes
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn teacher_creates_class() {
    let app = test_app().await;
    let (token, teacher_id) = signup(&app, "Teach", "teach@example.com", "teacher").await;

    let (status, body) = common::post_json_with_auth(
        &app,
        "/api/v1/classes",
        &json!({ "className": "Math 101" }),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");

    let resp: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(resp["className"], "Math 101");
    assert_eq!(resp["teacherId"], teacher_id.to_string());
    assert_eq!(resp["students"], json!([]));
}

#[tokio::test]
async fn student_cannot_create_class() {
    let app = test_app().await;
    let (token, _) = signup(&app, "Stu", "stu@example.com", "student").await;

    let (status, _body) = common::post_json_with_auth(
        &app,
        "/api/v1/classes",
        &json!({ "className": "Hacked 101" }),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_class_requires_auth() {
    let app = test_app().await;

    let (status, _body) =
        common::post_json(&app, "/api/v1/classes", &json!({ "className": "Anon 101" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_class_rejects_blank_name() {
    let app = test_app().await;
    let (token, _) = signup(&app, "Teach", "blank@example.com", "teacher").await;

    let (status, _body) = common::post_json_with_auth(
        &app,
        "/api/v1/classes",
        &json!({ "className": "   " }),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ──────────────────────────────────────────────────────────────────────────────
// POST /api/v1/classes/{classId}/students
// ──────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn owning_teacher_enrolls_student() {
    let app = test_app().await;
    let (teacher_token, _) = signup(&app, "Teach", "owner@example.com", "teacher").await;
    let (_, student_id) = signup(&app, "Stu", "enrollee@example.com", "student").await;
    let class_id = create_class(&app, &teacher_token, "Math 101").await;

    let (status, body) = common::post_json_with_auth(
        &app,
        &format!("/api/v1/classes/{class_id}/students"),
        &json!({ "studentId": student_id }),
        &teacher_token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "enroll failed: {body}");

    // The student now appears on the roster
    let (status, body) =
        common::get_with_auth(&app, &format!("/api/v1/classes/{class_id}"), &teacher_token).await;
    assert_eq!(status, StatusCode::OK);
    let resp: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    assert_eq!(resp["students"][0]["id"], student_id.to_string());
    assert_eq!(resp["students"][0]["email"], "enrollee@example.com");
}

#[tokio::test]
async fn non_owning_teacher_cannot_enroll() {
    let app = test_app().await;
    let (owner_token, _) = signup(&app, "Owner", "owner2@example.com", "teacher").await;
    let (other_token, _) = signup(&app, "Other", "other@example.com", "teacher").await;
    let (_, student_id) = signup(&app, "Stu", "stu2@example.com", "student").await;
    let class_id = create_class(&app, &owner_token, "Physics 201").await;

    let (status, _body) = common::post_json_with_auth(
        &app,
        &format!("/api/v1/classes/{class_id}/students"),
        &json!({ "studentId": student_id }),
        &other_token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn enrolling_a_teacher_is_rejected() {
    let app = test_app().await;
    let (teacher_token, teacher_id) = signup(&app, "Teach", "self@example.com", "teacher").await;
    let class_id = create_class(&app, &teacher_token, "Chem 301").await;

    let (status, _body) = common::post_json_with_auth(
        &app,
        &format!("/api/v1/classes/{class_id}/students"),
        &json!({ "studentId": teacher_id }),
        &teacher_token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_enrollment_conflicts() {
    let app = test_app().await;
    let (teacher_token, _) = signup(&app, "Teach", "dupteach@example.com", "teacher").await;
    let (_, student_id) = signup(&app, "Stu", "dupstu@example.com", "student").await;
    let class_id = create_class(&app, &teacher_token, "Bio 101").await;

    let payload = json!({ "studentId": student_id });
    let uri = format!("/api/v1/classes/{class_id}/students");

    let (status, _body) = common::post_json_with_auth(&app, &uri, &payload, &teacher_token).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _body) = common::post_json_with_auth(&app, &uri, &payload, &teacher_token).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn enrolling_unknown_student_is_not_found() {
    let app = test_app().await;
    let (teacher_token, _) = signup(&app, "Teach", "ghostteach@example.com", "teacher").await;
    let class_id = create_class(&app, &teacher_token, "History 101").await;

    let (status, _body) = common::post_json_with_auth(
        &app,
        &format!("/api/v1/classes/{class_id}/students"),
        &json!({ "studentId": Uuid::new_v4() }),
        &teacher_token,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_unknown_class_is_not_found() {
    let app = test_app().await;
    let (token, _) = signup(&app, "Teach", "lookup@example.com", "teacher").await;

    let (status, _body) =
        common::get_with_auth(&app, &format!("/api/v1/classes/{}", Uuid::new_v4()), &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
