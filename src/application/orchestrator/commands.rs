//! Outbound command builders — one function per OCPP CALL the central
//! system may issue, each building its typed `rust_ocpp` request and
//! returning the station's status word.

use rust_ocpp::v1_6::messages::change_availability::{
    ChangeAvailabilityRequest, ChangeAvailabilityResponse,
};
use rust_ocpp::v1_6::messages::change_configuration::{
    ChangeConfigurationRequest, ChangeConfigurationResponse,
};
use rust_ocpp::v1_6::messages::data_transfer::{DataTransferRequest, DataTransferResponse};
use rust_ocpp::v1_6::messages::get_configuration::{
    GetConfigurationRequest, GetConfigurationResponse,
};
use rust_ocpp::v1_6::messages::remote_start_transaction::{
    RemoteStartTransactionRequest, RemoteStartTransactionResponse,
};
use rust_ocpp::v1_6::messages::remote_stop_transaction::{
    RemoteStopTransactionRequest, RemoteStopTransactionResponse,
};
use rust_ocpp::v1_6::messages::reset::{ResetRequest, ResetResponse};
use rust_ocpp::v1_6::messages::unlock_connector::{
    UnlockConnectorRequest, UnlockConnectorResponse,
};
use rust_ocpp::v1_6::types::{AvailabilityType, ResetRequestStatus};
use serde_json::Value;
use tracing::info;

use crate::domain::error::DomainError;

use super::command_sender::SharedCommandSender;

fn to_payload<T: serde::Serialize>(request: &T) -> Result<Value, DomainError> {
    serde_json::to_value(request)
        .map_err(|e| DomainError::InvalidInput(format!("failed to serialize request: {e}")))
}

fn from_payload<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, DomainError> {
    serde_json::from_value(value)
        .map_err(|e| DomainError::ProtocolFramingError(format!("failed to parse response: {e}")))
}

pub enum ResetKind {
    Soft,
    Hard,
}

/// Dispatch RemoteStartTransaction. Arms `pending_remote[connector]` with
/// `id_tag` only if the station's reply is `Accepted` — the caller is
/// responsible for recording that on the orchestrator state.
pub async fn remote_start(
    command_sender: &SharedCommandSender,
    cpid: &str,
    connector_id: u32,
    id_tag: &str,
) -> Result<String, DomainError> {
    info!(cpid, connector_id, id_tag, "RemoteStartTransaction");
    let request = RemoteStartTransactionRequest {
        connector_id: Some(connector_id),
        id_tag: id_tag.to_string(),
        charging_profile: None,
    };
    let payload = to_payload(&request)?;
    let result = command_sender
        .send(cpid, "RemoteStartTransaction", payload)
        .await?;
    let response: RemoteStartTransactionResponse = from_payload(result)?;
    Ok(format!("{:?}", response.status))
}

pub async fn remote_stop(
    command_sender: &SharedCommandSender,
    cpid: &str,
    transaction_id: i32,
) -> Result<String, DomainError> {
    info!(cpid, transaction_id, "RemoteStopTransaction");
    let request = RemoteStopTransactionRequest { transaction_id };
    let payload = to_payload(&request)?;
    let result = command_sender
        .send(cpid, "RemoteStopTransaction", payload)
        .await?;
    let response: RemoteStopTransactionResponse = from_payload(result)?;
    Ok(format!("{:?}", response.status))
}

pub async fn reset(
    command_sender: &SharedCommandSender,
    cpid: &str,
    kind: ResetKind,
) -> Result<String, DomainError> {
    info!(cpid, "Reset");
    let kind = match kind {
        ResetKind::Soft => ResetRequestStatus::Soft,
        ResetKind::Hard => ResetRequestStatus::Hard,
    };
    let request = ResetRequest { kind };
    let payload = to_payload(&request)?;
    let result = command_sender.send(cpid, "Reset", payload).await?;
    let response: ResetResponse = from_payload(result)?;
    Ok(format!("{:?}", response.status))
}

pub async fn unlock_connector(
    command_sender: &SharedCommandSender,
    cpid: &str,
    connector_id: u32,
) -> Result<String, DomainError> {
    info!(cpid, connector_id, "UnlockConnector");
    let request = UnlockConnectorRequest { connector_id };
    let payload = to_payload(&request)?;
    let result = command_sender
        .send(cpid, "UnlockConnector", payload)
        .await?;
    let response: UnlockConnectorResponse = from_payload(result)?;
    Ok(format!("{:?}", response.status))
}

pub async fn change_availability(
    command_sender: &SharedCommandSender,
    cpid: &str,
    connector_id: u32,
    available: bool,
) -> Result<String, DomainError> {
    info!(cpid, connector_id, available, "ChangeAvailability");
    let request = ChangeAvailabilityRequest {
        connector_id,
        kind: if available {
            AvailabilityType::Operative
        } else {
            AvailabilityType::Inoperative
        },
    };
    let payload = to_payload(&request)?;
    let result = command_sender
        .send(cpid, "ChangeAvailability", payload)
        .await?;
    let response: ChangeAvailabilityResponse = from_payload(result)?;
    Ok(format!("{:?}", response.status))
}

pub async fn change_configuration(
    command_sender: &SharedCommandSender,
    cpid: &str,
    key: &str,
    value: &str,
) -> Result<String, DomainError> {
    info!(cpid, key, value, "ChangeConfiguration");
    let request = ChangeConfigurationRequest {
        key: key.to_string(),
        value: value.to_string(),
    };
    let payload = to_payload(&request)?;
    let result = command_sender
        .send(cpid, "ChangeConfiguration", payload)
        .await?;
    let response: ChangeConfigurationResponse = from_payload(result)?;
    Ok(format!("{:?}", response.status))
}

/// Result of a GetConfiguration call, with key casing tolerated on read
/// (the station may reply with snake_case or camelCase keys).
pub struct ConfigurationResult {
    pub configuration_key: Vec<(String, Option<String>)>,
    pub unknown_key: Vec<String>,
}

pub async fn get_configuration(
    command_sender: &SharedCommandSender,
    cpid: &str,
    keys: Option<Vec<String>>,
) -> Result<ConfigurationResult, DomainError> {
    info!(cpid, ?keys, "GetConfiguration");
    let request = GetConfigurationRequest { key: keys };
    let payload = to_payload(&request)?;
    let result = command_sender
        .send(cpid, "GetConfiguration", payload)
        .await?;
    let response: GetConfigurationResponse = from_payload(result)?;

    let configuration_key = response
        .configuration_key
        .unwrap_or_default()
        .into_iter()
        .map(|kv| (kv.key, kv.value))
        .collect();

    Ok(ConfigurationResult {
        configuration_key,
        unknown_key: response.unknown_key.unwrap_or_default(),
    })
}

pub async fn data_transfer(
    command_sender: &SharedCommandSender,
    cpid: &str,
    vendor_id: &str,
    message_id: Option<&str>,
    data: Value,
) -> Result<String, DomainError> {
    info!(cpid, vendor_id, message_id, "DataTransfer");
    let request = DataTransferRequest {
        vendor_id: vendor_id.to_string(),
        message_id: message_id.map(|s| s.to_string()),
        data: Some(data.to_string()),
    };
    let payload = to_payload(&request)?;
    let result = command_sender.send(cpid, "DataTransfer", payload).await?;
    let response: DataTransferResponse = from_payload(result)?;
    Ok(format!("{:?}", response.status))
}
