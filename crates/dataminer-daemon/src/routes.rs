//! Axum router and handlers for `dataminer-daemon`'s peripheral
//! health-check surface. `build_router` is the single entry point;
//! `main.rs` attaches tracing middleware after this call.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};

use crate::state::{AppState, HealthResponse};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        service: state.build.service,
        version: state.build.version,
    })
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.status_snapshot().await)
}
