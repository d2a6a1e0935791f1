//! `X-Api-Key` middleware — the control plane's only authorization
//! mechanism, per §1's non-goal of "authorization beyond a single static
//! control-plane key". When no key is configured, every request passes.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::router::AppState;

const API_KEY_HEADER: &str = "X-Api-Key";

pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = &state.api_key else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        Some(key) if key == expected => next.run(request).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "missing or invalid X-Api-Key" })),
        )
            .into_response(),
    }
}
