use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::session::AppState;
use crate::api::handlers::{dataset, query, session};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/session/login", post(session::login))
        .route("/api/session/logout", post(session::logout))
        .route("/api/session", get(session::current_session))
        .route(
            "/api/dataset",
            post(dataset::upload_dataset).get(dataset::current_dataset),
        )
        .route("/api/query", post(query::submit_query))
        .route("/api/result", get(query::result_page))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
