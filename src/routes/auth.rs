use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{jwt, password};
use crate::entities::user;
use crate::error::AppError;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the auth route group: `/auth/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn user_response(u: &user::Model) -> UserResponse {
    UserResponse {
        id: u.id,
        name: u.name.clone(),
        email: u.email.clone(),
        role: u.role.clone(),
        created_at: u.created_at.to_rfc3339(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/v1/auth/signup`
async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let email = body.email.trim().to_lowercase();
    let name = body.name.trim().to_string();

    // Validate input
    password::validate_email(&email).map_err(AppError::BadRequest)?;
    password::validate_name(&name).map_err(AppError::BadRequest)?;
    password::validate_password(&body.password).map_err(AppError::BadRequest)?;

    if body.role != "teacher" && body.role != "student" {
        return Err(AppError::BadRequest(
            "Role must be 'teacher' or 'student'.".to_string(),
        ));
    }

    // Check for existing user with same email
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered.".to_string()));
    }

    let password_hash = password::hash_password(&body.password)?;

    let now = Utc::now().fixed_offset();
    let user_id = Uuid::new_v4();

    let new_user = user::ActiveModel {
        id: Set(user_id),
        name: Set(name),
        email: Set(email),
        password_hash: Set(password_hash),
        role: Set(body.role.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let user_model = new_user
        .insert(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    tracing::info!(user_id = %user_model.id, role = %user_model.role, "User signed up");

    let token = jwt::generate_token(user_model.id, &user_model.role, &state.config)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: user_response(&user_model),
            token,
        }),
    ))
}

/// `POST /api/v1/auth/signin`
async fn signin(
    State(state): State<AppState>,
    Json(body): Json<SigninRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = body.email.trim().to_lowercase();

    let user_model = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password.".to_string()))?;

    let valid = password::verify_password(&body.password, &user_model.password_hash)?;
    if !valid {
        return Err(AppError::Unauthorized(
            "Invalid email or password.".to_string(),
        ));
    }

    let token = jwt::generate_token(user_model.id, &user_model.role, &state.config)?;

    Ok(Json(AuthResponse {
        user: user_response(&user_model),
        token,
    }))
}
