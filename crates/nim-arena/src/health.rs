//! HTTP liveness endpoint for load balancers and orchestrators.

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// `GET /health` → `200 {"status":"ok"}`.
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Serves [`router`] on `listener` until the process exits.
pub(crate) async fn serve(listener: TcpListener) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "health endpoint listening");
    }
    axum::serve(listener, router()).await
}
