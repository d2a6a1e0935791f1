//! `/api/v1/identify` and `/api/v1/wallet/{topup,charge}`.

use axum::extract::State;
use axum::Json;

use crate::application::control::UserIdentifier;
use crate::domain::error::DomainError;
use crate::interfaces::http::dto::{IdentifyResponse, WalletAmountRequest, WalletResponse};
use crate::interfaces::http::router::AppState;

pub async fn identify(
    State(state): State<AppState>,
    Json(body): Json<UserIdentifier>,
) -> Result<Json<IdentifyResponse>, DomainError> {
    let vid = state.control.identify(&body)?;
    Ok(Json(IdentifyResponse { vid }))
}

pub async fn topup(
    State(state): State<AppState>,
    Json(body): Json<WalletAmountRequest>,
) -> Result<Json<WalletResponse>, DomainError> {
    let vid = state.control.identify(&body.identifier)?;
    let balance = state.control.wallet_topup(&vid, body.amount);
    Ok(Json(WalletResponse { vid, balance }))
}

pub async fn charge(
    State(state): State<AppState>,
    Json(body): Json<WalletAmountRequest>,
) -> Result<Json<WalletResponse>, DomainError> {
    let vid = state.control.identify(&body.identifier)?;
    let balance = state.control.wallet_charge(&vid, body.amount)?;
    Ok(Json(WalletResponse { vid, balance }))
}
