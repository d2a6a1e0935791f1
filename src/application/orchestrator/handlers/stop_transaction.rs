//! StopTransaction — closes the active transaction matching
//! `transaction_id`, if any, and appends a completed session record.
//! An unknown transaction id is still acknowledged with no state change.

use std::sync::Arc;

use rust_ocpp::v1_6::messages::stop_transaction::{StopTransactionRequest, StopTransactionResponse};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;

use crate::application::orchestrator::state::Orchestrator;
use crate::domain::transaction::CompletedSessionRecord;

use super::HandlerError;

pub async fn handle(orchestrator: &Arc<Orchestrator>, payload: Value) -> Result<Value, HandlerError> {
    let request: StopTransactionRequest = serde_json::from_value(payload)
        .map_err(|e| ("FormationViolation".to_string(), e.to_string()))?;

    let connector_id = orchestrator
        .active
        .iter()
        .find(|e| e.value().transaction_id == request.transaction_id as i64)
        .map(|e| *e.key());

    if let Some(connector_id) = connector_id {
        if let Some((_, active)) = orchestrator.active.remove(&connector_id) {
            let record = CompletedSessionRecord::from_active(
                active,
                request.meter_stop as i64,
                request.timestamp,
            );
            orchestrator.history.lock().unwrap().push(record);
        }
    }

    let response = StopTransactionResponse {
        id_tag_info: Some(IdTagInfo {
            status: AuthorizationStatus::Accepted,
            expiry_date: None,
            parent_id_tag: None,
        }),
    };

    serde_json::to_value(&response).map_err(|e| ("InternalError".to_string(), e.to_string()))
}
