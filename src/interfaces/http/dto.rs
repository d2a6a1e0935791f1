//! Request bodies for the HTTP control-plane API (§6). Response bodies
//! are, wherever possible, the domain types themselves (`Station`,
//! `PendingEntry`, ...) — there is no separate DTO layer duplicating
//! their shape, since this service has no ORM entities to decouple from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStationRequest {
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub cpid: String,
    #[serde(rename = "connectorId")]
    pub connector_id: i64,
    #[serde(rename = "idTag")]
    pub id_tag: Option<String>,
    pub vid: Option<String>,
    pub mac: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StopRequest {
    pub cpid: String,
    #[serde(rename = "transactionId")]
    pub transaction_id: Option<i64>,
    #[serde(rename = "connectorId")]
    pub connector_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub cpid: String,
    #[serde(rename = "connectorId")]
    pub connector_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ResetTypeDto {
    Hard,
    Soft,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequestDto {
    pub cpid: String,
    #[serde(rename = "type")]
    pub kind: ResetTypeDto,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub cpid: String,
    #[serde(rename = "connectorId")]
    pub connector_id: i64,
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct WalletAmountRequest {
    pub identifier: crate::application::control::UserIdentifier,
    pub amount: rust_decimal::Decimal,
}

#[derive(Debug, Serialize)]
pub struct CommandAck {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct IdentifyResponse {
    pub vid: String,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub vid: String,
    pub balance: rust_decimal::Decimal,
}
