//! `/api/v1/{pending,active,history,status,overview}` — read-only,
//! cross-station aggregate views over every currently connected
//! orchestrator plus the station registry's pending table.

use axum::extract::State;
use axum::Json;

use crate::application::control::{ActiveEntry, HistoryEntry, Overview, PendingEntry, StatusEntry};
use crate::interfaces::http::router::AppState;

pub async fn pending(State(state): State<AppState>) -> Json<Vec<PendingEntry>> {
    Json(state.control.pending())
}

pub async fn active(State(state): State<AppState>) -> Json<Vec<ActiveEntry>> {
    Json(state.control.active())
}

pub async fn history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    Json(state.control.history())
}

pub async fn status(State(state): State<AppState>) -> Json<Vec<StatusEntry>> {
    Json(state.control.status())
}

pub async fn overview(State(state): State<AppState>) -> Json<Overview> {
    Json(state.control.overview())
}
