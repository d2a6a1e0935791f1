use axum::Json;
use chrono::Utc;

use crate::interfaces::http::dto::HealthResponse;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        time: Utc::now(),
    })
}
