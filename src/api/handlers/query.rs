use axum::{
    extract::{Query, State},
    Json,
};

use crate::api::handlers::session::AppState;
use crate::api::middleware::AppError;
use crate::models::{PageParams, PromptRequest};
use crate::view::{paginate, ChartModel};

/// Translate a natural-language prompt and execute the generated SQL
pub async fn submit_query(
    State(state): State<AppState>,
    Json(payload): Json<PromptRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let prompt = payload.prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::Validation("Question cannot be empty".to_string()));
    }

    tracing::info!(prompt = %prompt, "submitting natural language query");

    let mut orchestrator = state
        .orchestrator
        .try_lock()
        .map_err(|_| AppError::Busy("another operation is in flight".to_string()))?;
    let submission = orchestrator.submit(prompt).await?;

    // The SQL and the rows in this response come from the same
    // submission; the chart and first page are views over those rows.
    let chart = ChartModel::from_result(&submission.result);
    let page = paginate(&submission.result, 1);

    Ok(Json(serde_json::json!({
        "submission": submission,
        "chart": chart,
        "page": page,
    })))
}

/// A page of the displayed result, clamped into range
pub async fn result_page(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let orchestrator = state.orchestrator.lock().await;
    let submission = orchestrator
        .last_submission()
        .ok_or_else(|| AppError::NotFound("no result to display".to_string()))?;

    let page = paginate(&submission.result, params.page.unwrap_or(1));
    let chart = ChartModel::from_result(&submission.result);

    Ok(Json(serde_json::json!({
        "id": submission.id,
        "generated_sql": submission.generated_sql,
        "chart": chart,
        "page": page,
    })))
}
