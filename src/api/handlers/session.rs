use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::api::middleware::AppError;
use crate::models::LoginRequest;
use crate::services::SessionOrchestrator;

/// Application state
///
/// The orchestrator behind the mutex is the sole writer of session
/// state; handlers that trigger engine or network work take the lock
/// with `try_lock` so concurrent submissions are rejected as busy.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Mutex<SessionOrchestrator>>,
}

/// Sign in with the identity provider's credential
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut orchestrator = state.orchestrator.lock().await;
    let profile = orchestrator.login(&payload.credential)?;

    Ok(Json(serde_json::json!({
        "profile": profile,
    })))
}

/// Sign out, discarding the whole session
pub async fn logout(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let mut orchestrator = state.orchestrator.lock().await;
    orchestrator.logout();
    Ok(StatusCode::NO_CONTENT)
}

/// Current signed-in profile
pub async fn current_session(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let orchestrator = state.orchestrator.lock().await;
    let profile = orchestrator
        .profile()
        .cloned()
        .ok_or_else(|| AppError::Auth("not signed in".to_string()))?;

    Ok(Json(serde_json::json!({
        "profile": profile,
    })))
}
