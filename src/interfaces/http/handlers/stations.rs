//! `/api/v1/stations` — create/list/fetch/delete. Station CRUD is a
//! simple in-memory registry (§1: "not reimplemented in detail"); it is
//! independent of which cpids are currently connected over WebSocket.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::domain::station::Station;
use crate::interfaces::http::dto::CreateStationRequest;
use crate::interfaces::http::router::AppState;

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateStationRequest>,
) -> Json<Station> {
    Json(state.control.create_station(body.name, body.location))
}

pub async fn list(State(state): State<AppState>) -> Json<Vec<Station>> {
    Json(state.control.list_stations())
}

pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    match state.control.get_station(id) {
        Some(station) => Json(station).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "station not found" })),
        )
            .into_response(),
    }
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    if state.control.delete_station(id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "station not found" })),
        )
            .into_response()
    }
}
