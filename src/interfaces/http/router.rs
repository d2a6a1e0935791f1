//! Axum router assembly — one route per §6 endpoint, `TraceLayer` for
//! request logging and the `X-Api-Key` middleware layered over every
//! route except `/health`, matching the teacher's
//! `interfaces/http/router.rs` layering without the Swagger/JWT surface.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::application::control::ControlPlane;

use super::auth::require_api_key;
use super::handlers::{control, health, identity, stations, views};

/// Shared state for every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub control: ControlPlane,
    pub api_key: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/v1/stations", post(stations::create).get(stations::list))
        .route(
            "/api/v1/stations/{id}",
            get(stations::get).delete(stations::delete),
        )
        .route("/api/v1/start", post(control::start))
        .route("/api/v1/stop", post(control::stop))
        .route("/api/v1/release", post(control::release))
        .route("/api/v1/reset", post(control::reset))
        .route("/api/v1/availability", post(control::availability))
        .route("/api/v1/pending", get(views::pending))
        .route("/api/v1/active", get(views::active))
        .route("/api/v1/history", get(views::history))
        .route("/api/v1/status", get(views::status))
        .route("/api/v1/overview", get(views::overview))
        .route("/api/v1/identify", post(identity::identify))
        .route("/api/v1/wallet/topup", post(identity::topup))
        .route("/api/v1/wallet/charge", post(identity::charge))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/api/v1/health", get(health::health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
