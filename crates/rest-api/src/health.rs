use axum::{Json, Router, routing::get};
use serde::Serialize;

pub fn router() -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct ReadyStatus {
    status: &'static str,
}

async fn readyz() -> Json<ReadyStatus> {
    // Liveness only for now. Future revisions can probe the broker and
    // catalog connections.
    Json(ReadyStatus { status: "ready" })
}
