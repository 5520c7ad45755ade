//! Pulse Web Server
//!
//! Axum-based server exposing the WebSocket push endpoint, the pull
//! API, and the internal event-ingest endpoint.

pub mod routes;
pub mod state;
pub mod websocket;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use pulse_core::config::PulseConfig;
use pulse_store::{AuthoritativeSource, InMemorySource, StaticDirectory, UserDirectory};

use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/users/{id}/unread", get(routes::unread::get_unread))
        .route("/users/{id}/read", post(routes::unread::mark_read))
        .route("/users/{id}/read-all", post(routes::unread::mark_all_read))
        .route("/users/{id}/refresh", post(routes::unread::refresh))
        .with_state(state.clone());

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(websocket::ws_handler))
        .route("/internal/events", post(routes::internal::ingest))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the server with the roster from config and an in-memory
/// authoritative source. Embedders wiring a durable backend use
/// [`run_server_with`].
pub async fn run_server(config: &PulseConfig) -> anyhow::Result<()> {
    let directory: Arc<dyn UserDirectory> = Arc::new(StaticDirectory::new(config.roster()));
    let source: Arc<dyn AuthoritativeSource> = Arc::new(InMemorySource::new());
    run_server_with(config, directory, source).await
}

/// Run the server with explicit directory and authoritative-source
/// implementations.
pub async fn run_server_with(
    config: &PulseConfig,
    directory: Arc<dyn UserDirectory>,
    source: Arc<dyn AuthoritativeSource>,
) -> anyhow::Result<()> {
    let state = AppState::new(directory, source, config.dedup_retention);
    let app = create_router(state);

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    tracing::info!(
        "Pulse server listening on http://{}:{}",
        config.host,
        config.port
    );

    axum::serve(listener, app).await?;
    Ok(())
}
