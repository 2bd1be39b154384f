use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::jwt;
use crate::auth::middleware::{StudentUser, TeacherUser};
use crate::entities::{attendance, class, class_student};
use crate::error::AppError;
use crate::live::events::{parse_event, ClientEvent, EventParseError};
use crate::live::session::AttendanceStatus;
use crate::live::ClientKey;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Build the attendance route group: `/attendance/...`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_session))
        .route("/{class_id}/close", post(close_session))
        .route("/{class_id}/live", get(ws_upgrade))
        .route("/me", get(my_history))
        .route("/class/{class_id}", get(class_history))
}

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartSessionRequest {
    class_id: Uuid,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionSnapshot {
    class_id: Uuid,
    started_at: String,
    records: HashMap<Uuid, AttendanceStatus>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CloseSessionResponse {
    class_id: Uuid,
    present: usize,
    absent: usize,
    total: usize,
    archived: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttendanceRecordResponse {
    id: Uuid,
    class_id: Uuid,
    student_id: Uuid,
    status: String,
    session_started_at: String,
    recorded_at: String,
}

#[derive(Deserialize)]
struct LiveQueryParams {
    token: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Fetch a class and verify the calling teacher owns it.
async fn owned_class(
    state: &AppState,
    class_id: Uuid,
    teacher_id: Uuid,
) -> Result<class::Model, AppError> {
    let found = class::Entity::find_by_id(class_id)
        .one(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::NotFound("Class not found.".to_string()))?;

    if found.teacher_id != teacher_id {
        return Err(AppError::Forbidden(
            "Only the owning teacher can manage attendance for this class.".to_string(),
        ));
    }

    Ok(found)
}

fn record_response(r: attendance::Model) -> AttendanceRecordResponse {
    AttendanceRecordResponse {
        id: r.id,
        class_id: r.class_id,
        student_id: r.student_id,
        status: r.status,
        session_started_at: r.session_started_at.to_rfc3339(),
        recorded_at: r.recorded_at.to_rfc3339(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session lifecycle handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `POST /api/v1/attendance/start` — Open a live session for a class.
///
/// Always overwrites an already-open session for the class; the non-lossy
/// path is to close first, which archives the records.
async fn start_session(
    State(state): State<AppState>,
    TeacherUser(teacher): TeacherUser,
    Json(body): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let found = owned_class(&state, body.class_id, teacher.id).await?;

    let started_at = state.sessions.start(found.id);
    tracing::info!(class_id = %found.id, teacher_id = %teacher.id, "Attendance session started");

    let started_msg = json!({
        "event": "SESSION_STARTED",
        "data": {
            "classId": found.id,
            "startedAt": started_at.to_rfc3339(),
        }
    });
    state.connections.broadcast(found.id, &started_msg.to_string());

    Ok((
        StatusCode::CREATED,
        Json(SessionSnapshot {
            class_id: found.id,
            started_at: started_at.to_rfc3339(),
            records: HashMap::new(),
        }),
    ))
}

/// `POST /api/v1/attendance/{classId}/close` — Close the live session and
/// hand its records to the attendance archive.
async fn close_session(
    State(state): State<AppState>,
    TeacherUser(teacher): TeacherUser,
    Path(class_id): Path<Uuid>,
) -> Result<Json<CloseSessionResponse>, AppError> {
    owned_class(&state, class_id, teacher.id).await?;

    // Archive from a snapshot while the session stays in the store; it is
    // only cleared once the transaction has committed, so a failed archive
    // loses nothing.
    let session = state.sessions.snapshot(class_id).ok_or_else(|| {
        AppError::NotFound("No active attendance session for this class.".to_string())
    })?;
    let summary = session.summarize();

    let now = Utc::now().fixed_offset();
    let session_started_at = session.started_at.fixed_offset();

    let txn = state
        .db
        .begin()
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    for (student_id, status) in &session.records {
        let record = attendance::ActiveModel {
            id: Set(Uuid::new_v4()),
            class_id: Set(class_id),
            student_id: Set(*student_id),
            status: Set(status.as_str().to_string()),
            session_started_at: Set(session_started_at),
            recorded_at: Set(now),
        };
        record
            .insert(&txn)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
    }

    txn.commit()
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let _ = state.sessions.close(class_id);

    tracing::info!(
        class_id = %class_id,
        archived = summary.total,
        "Attendance session closed and archived"
    );

    let closed_msg = json!({
        "event": "SESSION_CLOSED",
        "data": {
            "classId": class_id,
            "present": summary.present,
            "absent": summary.absent,
            "total": summary.total,
        }
    });
    state.connections.broadcast(class_id, &closed_msg.to_string());

    Ok(Json(CloseSessionResponse {
        class_id,
        present: summary.present,
        absent: summary.absent,
        total: summary.total,
        archived: summary.total,
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// History handlers
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /api/v1/attendance/me` — The calling student's archived history.
async fn my_history(
    State(state): State<AppState>,
    StudentUser(student): StudentUser,
) -> Result<Json<Vec<AttendanceRecordResponse>>, AppError> {
    let rows = attendance::Entity::find()
        .filter(attendance::Column::StudentId.eq(student.id))
        .order_by_desc(attendance::Column::RecordedAt)
        .all(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(Json(rows.into_iter().map(record_response).collect()))
}

/// `GET /api/v1/attendance/class/{classId}` — A class's archived history
/// (owning teacher only).
async fn class_history(
    State(state): State<AppState>,
    TeacherUser(teacher): TeacherUser,
    Path(class_id): Path<Uuid>,
) -> Result<Json<Vec<AttendanceRecordResponse>>, AppError> {
    owned_class(&state, class_id, teacher.id).await?;

    let rows = attendance::Entity::find()
        .filter(attendance::Column::ClassId.eq(class_id))
        .order_by_desc(attendance::Column::RecordedAt)
        .all(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok(Json(rows.into_iter().map(record_response).collect()))
}

// ─────────────────────────────────────────────────────────────────────────────
// WebSocket
// ─────────────────────────────────────────────────────────────────────────────

/// `GET /api/v1/attendance/{classId}/live` — Upgrade to `WebSocket`.
///
/// The bearer token travels as a `?token=` query parameter; the upgrade is
/// refused with 401 before any event can be exchanged if it is missing or
/// invalid. The verified `{user_id, role}` claim is attached to the
/// connection for its whole lifetime.
async fn ws_upgrade(
    State(state): State<AppState>,
    Path(class_id): Path<Uuid>,
    Query(params): Query<LiveQueryParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let token = params.token.ok_or_else(|| {
        AppError::Unauthorized("Token required for live connection.".to_string())
    })?;

    let claims = jwt::validate_token(&token, &state.config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token.".to_string()))?;

    let user_id: Uuid = claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("Invalid token subject.".to_string()))?;

    // Validate the class exists before accepting the upgrade
    class::Entity::find_by_id(class_id)
        .one(&state.db)
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .ok_or_else(|| AppError::NotFound("Class not found.".to_string()))?;

    let key = match claims.role.as_str() {
        "teacher" => ClientKey::Teacher(user_id),
        "student" => ClientKey::Student(user_id),
        _ => {
            return Err(AppError::Forbidden(
                "Role must be 'teacher' or 'student'.".to_string(),
            ));
        }
    };

    let ws_state = state.clone();

    Ok(ws.on_upgrade(move |socket| handle_live_connection(ws_state, class_id, key, socket)))
}

/// Handle a single `WebSocket` connection for live attendance events.
async fn handle_live_connection(
    state: AppState,
    class_id: Uuid,
    key: ClientKey,
    socket: WebSocket,
) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();

    // Register this connection for broadcast delivery
    state
        .connections
        .register(class_id, key.clone(), tx.clone());

    let connected_msg = json!({
        "event": "CONNECTED",
        "data": {
            "classId": class_id,
            "role": key.role_str(),
            "userId": key.user_id(),
        }
    });
    let _ = ws_sink
        .send(Message::Text(connected_msg.to_string().into()))
        .await;

    // Spawn task to forward outbound messages to the WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sink.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Process inbound messages to completion, one at a time per connection
    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            Message::Text(text) => {
                let reply = handle_live_event(&state, class_id, &key, &text).await;
                if tx.send(reply).is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Cleanup on disconnect
    send_task.abort();
    state.connections.unregister(class_id, &key);
}

/// Dispatch one inbound event and return the direct reply for the sender.
///
/// Command-level failures are structured replies; they never close the
/// connection. Successful marks broadcast the delta and updated counts to
/// the class's other connections.
async fn handle_live_event(
    state: &AppState,
    class_id: Uuid,
    sender: &ClientKey,
    text: &str,
) -> String {
    let event = match parse_event(text) {
        Ok(event) => event,
        Err(EventParseError::InvalidSchema) => {
            return json!({"success": false, "error": "Invalid msg schema"}).to_string();
        }
        Err(EventParseError::UnknownEvent(kind)) => {
            tracing::warn!(kind = %kind, "Unrecognized live event kind");
            return json!({"success": false, "error": "Unknown event"}).to_string();
        }
    };

    match event {
        ClientEvent::AttendanceMarked { student_id, status } => {
            if !sender.is_teacher() {
                return teacher_only_error();
            }
            if !state.sessions.is_open(class_id) {
                return json!({"success": false, "error": "No active session"}).to_string();
            }

            // Roster membership check before the upsert. This lookup only
            // suspends this connection's handler.
            match class_student::Entity::find_by_id((class_id, student_id))
                .one(&state.db)
                .await
            {
                Ok(Some(_)) => {}
                Ok(None) => {
                    return json!({
                        "success": false,
                        "error": "Student not enrolled in this class"
                    })
                    .to_string();
                }
                Err(err) => {
                    tracing::error!("Roster lookup failed: {err}");
                    return json!({"success": false, "error": "Internal error"}).to_string();
                }
            }

            // The session may have been closed while the lookup was in flight
            if state.sessions.mark(class_id, student_id, status).is_err() {
                return json!({"success": false, "error": "No active session"}).to_string();
            }

            let delta = json!({
                "event": "ATTENDANCE_MARKED",
                "data": { "studentId": student_id, "status": status }
            });
            state
                .connections
                .broadcast_except(class_id, sender, &delta.to_string());

            let update = json!({
                "event": "TODAY_SUMMARY",
                "data": state.sessions.summarize(class_id)
            });
            state
                .connections
                .broadcast_except(class_id, sender, &update.to_string());

            json!({
                "success": true,
                "data": { "studentId": student_id, "status": status }
            })
            .to_string()
        }

        ClientEvent::TodaySummary => {
            if !sender.is_teacher() {
                return teacher_only_error();
            }
            json!({
                "success": true,
                "event": "TODAY_SUMMARY",
                "data": state.sessions.summarize(class_id)
            })
            .to_string()
        }

        ClientEvent::MyAttendance => {
            if sender.is_teacher() {
                return json!({
                    "event": "ERROR",
                    "data": { "message": "Forbidden, student event only" }
                })
                .to_string();
            }
            let status = state
                .sessions
                .status_of(class_id, sender.user_id())
                .map_or("not recorded", AttendanceStatus::as_str);
            json!({
                "success": true,
                "event": "MY_ATTENDANCE",
                "data": { "status": status }
            })
            .to_string()
        }
    }
}

/// Legacy role-violation shape kept for client compatibility.
fn teacher_only_error() -> String {
    json!({
        "event": "ERROR",
        "data": { "message": "Forbidden, teacher event only" }
    })
    .to_string()
}
