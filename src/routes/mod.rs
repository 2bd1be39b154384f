mod attendance;
mod auth;
mod classes;
mod health;

use axum::Router;

use crate::state::AppState;

/// Build the complete application router.
///
/// Structure:
/// - `GET /health` — lightweight health check (used by deploy platforms)
/// - `/api/v1/auth` — signup/signin
/// - `/api/v1/classes` — class and roster management
/// - `/api/v1/attendance` — session lifecycle, history, live WebSocket
pub fn router() -> Router<AppState> {
    let api_v1 = Router::new()
        .merge(health::api_router())
        .nest("/auth", auth::router())
        .nest("/classes", classes::router())
        .nest("/attendance", attendance::router());

    Router::new()
        .merge(health::root_router())
        .nest("/api/v1", api_v1)
}
