use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber;

mod api;
mod config;
mod models;
mod services;
mod view;

use api::handlers::session::AppState;
use config::Config;
use services::{
    EngineSettings, GenerationClient, IdentityService, QueryTranslator, SessionOrchestrator,
    TabularEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Starting server on {}", config.server_address());

    // One engine and one session per process; the orchestrator is the
    // sole writer of session state.
    let engine = Arc::new(TabularEngine::new(EngineSettings::default()));
    let translator: Arc<dyn QueryTranslator> = Arc::new(GenerationClient::new(&config));
    let orchestrator =
        SessionOrchestrator::new(IdentityService::new(&config), engine, translator);

    let state = AppState {
        orchestrator: Arc::new(Mutex::new(orchestrator)),
    };
    let app: Router = api::routes::create_router(state);

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
