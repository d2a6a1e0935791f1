//! `/api/v1/{start,stop,release,reset,availability}` — dispatch outbound
//! OCPP commands via `ControlPlane`, surfacing station rejections as 409
//! and unknown cpids as 404 through `DomainError`'s `IntoResponse`.

use axum::extract::State;
use axum::Json;

use crate::application::orchestrator::commands::ResetKind;
use crate::domain::error::DomainError;
use crate::interfaces::http::dto::{
    AvailabilityRequest, CommandAck, ReleaseRequest, ResetRequestDto, ResetTypeDto, StartRequest,
    StopRequest,
};
use crate::interfaces::http::router::AppState;

pub async fn start(
    State(state): State<AppState>,
    Json(body): Json<StartRequest>,
) -> Result<Json<CommandAck>, DomainError> {
    let id_tag = body.id_tag.ok_or_else(|| {
        DomainError::InvalidInput("idTag is required to dispatch RemoteStartTransaction".to_string())
    })?;
    let status = state
        .control
        .start(&body.cpid, body.connector_id, id_tag, body.vid, body.mac)
        .await?;
    Ok(Json(CommandAck { status }))
}

pub async fn stop(
    State(state): State<AppState>,
    Json(body): Json<StopRequest>,
) -> Result<Json<CommandAck>, DomainError> {
    let status = state
        .control
        .stop(&body.cpid, body.transaction_id, body.connector_id)
        .await?;
    Ok(Json(CommandAck { status }))
}

pub async fn release(
    State(state): State<AppState>,
    Json(body): Json<ReleaseRequest>,
) -> Result<Json<CommandAck>, DomainError> {
    let status = state.control.release(&body.cpid, body.connector_id).await?;
    Ok(Json(CommandAck { status }))
}

pub async fn reset(
    State(state): State<AppState>,
    Json(body): Json<ResetRequestDto>,
) -> Result<Json<CommandAck>, DomainError> {
    let kind = match body.kind {
        ResetTypeDto::Hard => ResetKind::Hard,
        ResetTypeDto::Soft => ResetKind::Soft,
    };
    let status = state.control.reset(&body.cpid, kind).await?;
    Ok(Json(CommandAck { status }))
}

pub async fn availability(
    State(state): State<AppState>,
    Json(body): Json<AvailabilityRequest>,
) -> Result<Json<CommandAck>, DomainError> {
    let status = state
        .control
        .change_availability(&body.cpid, body.connector_id, body.available)
        .await?;
    Ok(Json(CommandAck { status }))
}
