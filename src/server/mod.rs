//! HTTP layer for the ingestion service.
//!
//! `POST /api/index/jsonl` runs one ingestion, `/` answers with a welcome
//! message and every other path is a 404.

pub mod handlers;

#[cfg(test)]
mod tests;

use axum::Router;
use axum::routing::{any, post};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::IngestError;
use crate::config::Config;
use crate::ingest::Ingestor;

pub const INDEX_JSONL_PATH: &str = "/api/index/jsonl";

/// Shared state handed to every handler
#[derive(Clone, Debug)]
pub struct AppState {
    pub ingestor: Arc<Ingestor>,
}

/// Build the router with all routes and middleware
#[inline]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(handlers::welcome))
        .route(
            INDEX_JSONL_PATH,
            post(handlers::index_jsonl).fallback(handlers::not_found),
        )
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl+C
#[inline]
pub async fn serve(config: Config) -> Result<(), IngestError> {
    let address = config.server.address();
    let ingestor = Arc::new(Ingestor::new(config)?);
    let listener = TcpListener::bind(&address).await?;
    serve_with_shutdown(listener, ingestor, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves
#[inline]
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    ingestor: Arc<Ingestor>,
    shutdown: F,
) -> Result<(), IngestError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    info!("Listening on http://{}", local_addr);

    let app = build_router(AppState { ingestor });
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
