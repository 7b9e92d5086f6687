//! Router for the liveness endpoints

use axum::{Router, response::Json, routing::get};

use super::public;
use crate::api::routes::SharedState;

async fn root_handler() -> Json<public::RootResponse> {
    Json(public::RootResponse {
        message: "Scheduling agent is running".to_string(),
    })
}

async fn health_handler() -> Json<public::HealthResponse> {
    Json(public::HealthResponse {
        status: "ok".to_string(),
    })
}

/// Create the health router, mounted at the root
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(root_handler))
        .route("/healthz", get(health_handler))
}
