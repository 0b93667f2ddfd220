// Chat server - HTTP surface over ChatApp
//
// One text box, one submit action, feedback buttons. Rendering is left to the
// client; this only exposes the session state machine.

mod handlers;
pub mod types;

pub use handlers::{create_router, health_check};
pub use types::*;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app::ChatApp;

/// Serve until Ctrl-C, then stop the session sweeper and every publisher
pub async fn serve(app: Arc<ChatApp>, bind_address: &str) -> Result<()> {
    let addr: SocketAddr = bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", bind_address))?;

    // 1MB is plenty for a chat query
    let router = create_router(Arc::clone(&app))
        .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Starting chat server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    let sweeper = app.spawn_session_sweeper();
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    app.shutdown();
    if let Err(e) = sweeper.await {
        tracing::warn!("Session sweeper ended abnormally: {}", e);
    }
    tracing::info!("Chat server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
