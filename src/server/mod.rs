use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::storage::ConnectionPool;

pub mod routes;

/// Server state
pub struct AppState {
    pub pool: ConnectionPool,
}

/// Build the HTTP router over a connection pool
pub fn router(pool: ConnectionPool, max_upload_bytes: usize) -> Router {
    let state = Arc::new(AppState { pool });

    Router::new()
        .route("/create_category", post(routes::create_category))
        .route("/upload_file", post(routes::upload_file))
        .route("/sum_type", get(routes::sum_type))
        .route("/find_regions", get(routes::find_regions))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(
    port: u16,
    pool: ConnectionPool,
    max_upload_bytes: usize,
) -> anyhow::Result<()> {
    let app = router(pool, max_upload_bytes);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
