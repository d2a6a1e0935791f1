//! StatusNotification — tracks connector status, ensures a pending
//! session exists while a connector is being prepared, and arms/cancels
//! the no-session watchdog.

use std::sync::Arc;

use chrono::Utc;
use rust_ocpp::v1_6::messages::status_notification::{
    StatusNotificationRequest, StatusNotificationResponse,
};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::application::orchestrator::commands;
use crate::application::orchestrator::state::Orchestrator;
use crate::domain::station::{ConnectorStatus, PendingSession};

use super::HandlerError;

/// Reserved connector id used as a station-wide wildcard pending slot —
/// where a DataTransfer VID/MAC hint lands when no connector-specific
/// pending entry exists yet to receive it.
const STATION_WILDCARD_CONNECTOR: i64 = 0;

pub async fn handle(orchestrator: &Arc<Orchestrator>, payload: Value) -> Result<Value, HandlerError> {
    let request: StatusNotificationRequest = serde_json::from_value(payload)
        .map_err(|e| ("FormationViolation".to_string(), e.to_string()))?;

    let connector_id = request.connector_id as i64;
    let status = ConnectorStatus::from(request.status);
    orchestrator.connector_status.insert(connector_id, status);

    let cpid = orchestrator.cpid.clone();
    let stations = &orchestrator.services.stations;

    if status == ConnectorStatus::Preparing {
        let needs_seed = stations
            .get_pending(&cpid, connector_id)
            .map(|p| p.is_empty())
            .unwrap_or(true);

        if needs_seed {
            let wildcard = stations.get_pending(&cpid, STATION_WILDCARD_CONNECTOR);
            let (mut vid, mac) = match &wildcard {
                Some(w) => (w.vid.clone(), w.mac.clone()),
                None => (orchestrator.last_seen_vid(), orchestrator.last_seen_mac()),
            };

            if vid.is_none() {
                let raw = format!("temp:{cpid}:{connector_id}:{}", Uuid::new_v4());
                vid = Some(orchestrator.services.identity.resolve("temp", &raw));
            }

            stations.set_pending(
                &cpid,
                connector_id,
                PendingSession {
                    id_tag: None,
                    vid,
                    mac,
                    created_at: Some(Utc::now()),
                    vid_pinned: false,
                },
            );
        }

        stations.clear_pending(&cpid, STATION_WILDCARD_CONNECTOR);
    } else {
        stations.clear_pending(&cpid, connector_id);
    }

    if status.is_armed_state() && !orchestrator.has_active_transaction(connector_id) {
        arm_watchdog(orchestrator, connector_id);
    } else {
        orchestrator.watchdogs.cancel(connector_id);
    }

    let response = StatusNotificationResponse {};
    serde_json::to_value(&response).map_err(|e| ("InternalError".to_string(), e.to_string()))
}

fn arm_watchdog(orchestrator: &Arc<Orchestrator>, connector_id: i64) {
    let orchestrator = orchestrator.clone();
    orchestrator.watchdogs.arm(connector_id, move || async move {
        // `abort()` only cancels at the next `.await`, so re-check the
        // connector is still armed and session-less at expiry instead of
        // trusting cancellation alone — a concurrent StartTransaction or
        // status change can win the race before this task is scheduled.
        let still_armed = orchestrator
            .connector_status
            .get(&connector_id)
            .map(|s| s.is_armed_state())
            .unwrap_or(false);
        if !still_armed || orchestrator.has_active_transaction(connector_id) {
            return;
        }

        warn!(
            cpid = %orchestrator.cpid,
            connector_id,
            "no-session watchdog fired, unlocking connector"
        );
        let _ = commands::unlock_connector(
            &orchestrator.services.command_sender,
            &orchestrator.cpid,
            connector_id as u32,
        )
        .await;
        orchestrator.pending_remote.remove(&connector_id);
        orchestrator
            .services
            .stations
            .clear_pending(&orchestrator.cpid, connector_id);
    });
}
