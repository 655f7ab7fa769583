use axum::Json;

use kindred_shared::types::HealthResponse;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("kindred-engine", env!("CARGO_PKG_VERSION")))
}
