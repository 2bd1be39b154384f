use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::middleware::{AuthUser, TeacherUser};
use crate::entities::{class, class_student, user};
use crate::error::AppError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the class route group: `/classes/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_class))
        .route("/{class_id}", get(get_class))
        .route("/{class_id}/students", post(add_student))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateClassRequest {
    class_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddStudentRequest {
    student_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassResponse {
    id: Uuid,
    class_name: String,
    teacher_id: Uuid,
    created_at: String,
    students: Vec<StudentResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StudentResponse {
    id: Uuid,
    name: String,
    email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnrollmentResponse {
    class_id: Uuid,
    student_id: Uuid,
    enrolled_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/v1/classes` — Create a class owned by the calling teacher.
async fn create_class(
    State(state): State<AppState>,
    TeacherUser(teacher): TeacherUser,
    Json(body): Json<CreateClassRequest>,
) -> Result<(StatusCode, Json<ClassResponse>), AppError> {
    let class_name = body.class_name.trim().to_string();
    if class_name.is_empty() || class_name.len() > 200 {
        return Err(AppError::BadRequest(
            "Class name must be between 1 and 200 characters.".to_string(),
        ));
    }

    let now = Utc::now().fixed_offset();
    let new_class = class::ActiveModel {
        id: Set(Uuid::new_v4()),
        class_name: Set(class_name),
        teacher_id: Set(teacher.id),
        created_at: Set(now),
    };

    let inserted = new_class
        .insert(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok((
        StatusCode::CREATED,
        Json(ClassResponse {
            id: inserted.id,
            class_name: inserted.class_name,
            teacher_id: inserted.teacher_id,
            created_at: inserted.created_at.to_rfc3339(),
            students: vec![],
        }),
    ))
}

/// `GET /api/v1/classes/{classId}` — Fetch a class with its roster.
async fn get_class(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(class_id): Path<Uuid>,
) -> Result<Json<ClassResponse>, AppError> {
    let found = class::Entity::find_by_id(class_id)
        .one(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::NotFound("Class not found.".to_string()))?;

    let enrollments = class_student::Entity::find()
        .filter(class_student::Column::ClassId.eq(class_id))
        .all(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let student_ids: Vec<Uuid> = enrollments.iter().map(|e| e.student_id).collect();
    let students = if student_ids.is_empty() {
        vec![]
    } else {
        user::Entity::find()
            .filter(user::Column::Id.is_in(student_ids))
            .all(&state.db)
            .await
            .map_err(|e| AppError::Internal(e.into()))?
    };

    Ok(Json(ClassResponse {
        id: found.id,
        class_name: found.class_name,
        teacher_id: found.teacher_id,
        created_at: found.created_at.to_rfc3339(),
        students: students
            .into_iter()
            .map(|s| StudentResponse {
                id: s.id,
                name: s.name,
                email: s.email,
            })
            .collect(),
    }))
}

/// `POST /api/v1/classes/{classId}/students` — Enroll a student (owning teacher only).
async fn add_student(
    State(state): State<AppState>,
    TeacherUser(teacher): TeacherUser,
    Path(class_id): Path<Uuid>,
    Json(body): Json<AddStudentRequest>,
) -> Result<(StatusCode, Json<EnrollmentResponse>), AppError> {
    let found = class::Entity::find_by_id(class_id)
        .one(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::NotFound("Class not found.".to_string()))?;

    if found.teacher_id != teacher.id {
        return Err(AppError::Forbidden(
            "Only the owning teacher can modify the roster.".to_string(),
        ));
    }

    let student = user::Entity::find_by_id(body.student_id)
        .one(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::NotFound("Student not found.".to_string()))?;

    if student.role != "student" {
        return Err(AppError::BadRequest(
            "Only users with the student role can be enrolled.".to_string(),
        ));
    }

    let existing = class_student::Entity::find_by_id((class_id, student.id))
        .one(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "Student is already enrolled in this class.".to_string(),
        ));
    }

    let now = Utc::now().fixed_offset();
    let enrollment = class_student::ActiveModel {
        class_id: Set(class_id),
        student_id: Set(student.id),
        enrolled_at: Set(now),
    };
    let inserted = enrollment
        .insert(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok((
        StatusCode::CREATED,
        Json(EnrollmentResponse {
            class_id: inserted.class_id,
            student_id: inserted.student_id,
            enrolled_at: inserted.enrolled_at.to_rfc3339(),
        }),
    ))
}
