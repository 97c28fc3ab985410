//! Health check endpoints

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::db::{DbPools, DEFAULT_CONN_NAME, DEFAULT_SEARCH_PATH};
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub database: bool,
}

/// Health check - always returns OK if the server is running
async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check - verifies the database connection can be fetched
/// and revalidated
async fn readyz(State(state): State<AppState>) -> Json<ReadyResponse> {
    let key = DbPools::key(DEFAULT_CONN_NAME, DEFAULT_SEARCH_PATH);
    let db_ok = state.pools.get(&key, &state.shutdown).await.is_ok();

    Json(ReadyResponse {
        ready: db_ok,
        database: db_ok,
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
}
