//! StartTransaction — authenticates against any armed remote-start,
//! allocates a transaction id, and arms the zero-credit cut-off.

use std::sync::Arc;

use rust_ocpp::v1_6::messages::start_transaction::{StartTransactionRequest, StartTransactionResponse};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::info;

use crate::application::orchestrator::commands;
use crate::application::orchestrator::state::Orchestrator;
use crate::domain::transaction::ActiveTransaction;

use super::HandlerError;

pub async fn handle(orchestrator: &Arc<Orchestrator>, payload: Value) -> Result<Value, HandlerError> {
    let request: StartTransactionRequest = serde_json::from_value(payload)
        .map_err(|e| ("FormationViolation".to_string(), e.to_string()))?;

    let connector_id = request.connector_id as i64;
    let cpid = orchestrator.cpid.clone();

    if let Some(armed_tag) = orchestrator.pending_remote.get(&connector_id).map(|e| e.clone()) {
        if armed_tag != request.id_tag {
            info!(
                cpid,
                connector_id,
                expected = armed_tag.as_str(),
                got = request.id_tag.as_str(),
                "StartTransaction id_tag mismatch against armed remote-start"
            );
            clear_pending(orchestrator, connector_id);

            let unlock_orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                let _ = commands::unlock_connector(
                    &unlock_orchestrator.services.command_sender,
                    &unlock_orchestrator.cpid,
                    connector_id as u32,
                )
                .await;
            });

            let response = StartTransactionResponse {
                transaction_id: 0,
                id_tag_info: IdTagInfo {
                    status: AuthorizationStatus::Invalid,
                    expiry_date: None,
                    parent_id_tag: None,
                },
            };
            return serde_json::to_value(&response)
                .map_err(|e| ("InternalError".to_string(), e.to_string()));
        }
    }

    let transaction_id = orchestrator.services.next_transaction_id();

    let pending = orchestrator.services.stations.get_pending(&cpid, connector_id);
    let pending_vid = pending.as_ref().and_then(|p| p.vid.clone());
    let pending_mac = pending.as_ref().and_then(|p| p.mac.clone());

    let vid = pending_vid
        .or_else(|| Some(orchestrator.services.identity.resolve("id_tag", &request.id_tag)))
        .or_else(|| orchestrator.last_seen_vid())
        .or_else(|| {
            orchestrator
                .last_seen_mac()
                .map(|mac| orchestrator.services.identity.resolve("mac", &mac))
        })
        .expect("resolve() always yields a VID");

    let mac = pending_mac.or_else(|| orchestrator.last_seen_mac());

    let active = ActiveTransaction::new(
        transaction_id,
        connector_id,
        request.id_tag.clone(),
        request.meter_start as i64,
        request.timestamp,
        Some(vid.clone()),
        mac,
    );
    orchestrator.active.insert(connector_id, active);

    clear_pending(orchestrator, connector_id);

    let response = StartTransactionResponse {
        transaction_id: transaction_id as i32,
        id_tag_info: IdTagInfo {
            status: AuthorizationStatus::Accepted,
            expiry_date: None,
            parent_id_tag: None,
        },
    };
    let payload = serde_json::to_value(&response)
        .map_err(|e| ("InternalError".to_string(), e.to_string()))?;

    let cutoff_orchestrator = orchestrator.clone();
    tokio::spawn(async move {
        if cutoff_orchestrator.services.wallet.balance(&vid) <= rust_decimal::Decimal::ZERO {
            info!(
                cpid = cutoff_orchestrator.cpid,
                transaction_id, vid, "zero-credit cut-off, dispatching RemoteStopTransaction"
            );
            let _ = commands::remote_stop(
                &cutoff_orchestrator.services.command_sender,
                &cutoff_orchestrator.cpid,
                transaction_id as i32,
            )
            .await;
        }
    });

    Ok(payload)
}

fn clear_pending(orchestrator: &Arc<Orchestrator>, connector_id: i64) {
    orchestrator.pending_remote.remove(&connector_id);
    orchestrator
        .services
        .stations
        .clear_pending(&orchestrator.cpid, connector_id);
    orchestrator.watchdogs.cancel(connector_id);
}
