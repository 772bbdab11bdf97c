//! Liveness and readiness endpoints.

use crate::error::ControllerError;
use axum::{Router, routing::get};
use std::net::SocketAddr;
use tracing::info;

async fn ok() -> &'static str {
    "ok"
}

/// Router serving `/healthz` and `/readyz`
pub fn router() -> Router {
    Router::new()
        .route("/healthz", get(ok))
        .route("/readyz", get(ok))
}

/// Serves the probe endpoints on `addr` until the listener fails
pub async fn serve(addr: SocketAddr) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "probe server listening");
    axum::serve(listener, router()).await?;
    Ok(())
}
