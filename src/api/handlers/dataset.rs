use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};

use crate::api::handlers::session::AppState;
use crate::api::middleware::AppError;

/// Upload a CSV file and load it as the session's dataset
pub async fn upload_dataset(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    // Take the first file part; anything else in the form is ignored.
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid upload: {}", e)))?
    {
        let Some(filename) = field.file_name().map(|name| name.to_string()) else {
            continue;
        };
        let contents = field
            .bytes()
            .await
            .map_err(|e| AppError::Ingest(format!("could not read upload: {}", e)))?;
        upload = Some((filename, contents.to_vec()));
        break;
    }

    let (filename, contents) =
        upload.ok_or_else(|| AppError::Validation("upload must contain a file".to_string()))?;

    tracing::info!(file = %filename, bytes = contents.len(), "ingesting uploaded file");

    let mut orchestrator = state
        .orchestrator
        .try_lock()
        .map_err(|_| AppError::Busy("another operation is in flight".to_string()))?;
    let handle = orchestrator.ingest(&filename, contents).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "table": handle,
        })),
    ))
}

/// The currently loaded dataset, if any
pub async fn current_dataset(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let orchestrator = state.orchestrator.lock().await;
    let handle = orchestrator
        .table()
        .cloned()
        .ok_or_else(|| AppError::NotFound("no dataset loaded".to_string()))?;

    Ok(Json(serde_json::json!({
        "table": handle,
    })))
}
