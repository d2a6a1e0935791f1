//! DataTransfer — extracts whatever VID/MAC hints a vendor payload
//! carries and propagates the result across the station's pending
//! entries and the orchestrator's "last seen" hints.
//!
//! A station-wide wildcard pending entry at connector id 0 also receives
//! the hint, so a later StatusNotification transition into `Preparing`
//! on whichever connector actually starts preparing can pick it up even
//! though DataTransfer itself carries no connector id.

use std::sync::Arc;

use rust_ocpp::v1_6::messages::data_transfer::{DataTransferRequest, DataTransferResponse};
use rust_ocpp::v1_6::types::DataTransferStatus;
use serde_json::Value;

use crate::application::orchestrator::state::Orchestrator;
use crate::domain::station::PendingSession;

use super::HandlerError;

const STATION_WILDCARD_CONNECTOR: i64 = 0;

pub async fn handle(orchestrator: &Arc<Orchestrator>, payload: Value) -> Result<Value, HandlerError> {
    let request: DataTransferRequest = serde_json::from_value(payload)
        .map_err(|e| ("FormationViolation".to_string(), e.to_string()))?;

    let accepted = reconcile(orchestrator, &request);

    let response = DataTransferResponse {
        status: if accepted {
            DataTransferStatus::Accepted
        } else {
            DataTransferStatus::Rejected
        },
        data: None,
    };

    serde_json::to_value(&response).map_err(|e| ("InternalError".to_string(), e.to_string()))
}

fn reconcile(orchestrator: &Arc<Orchestrator>, request: &DataTransferRequest) -> bool {
    let mut given_vid = None;
    let mut given_mac = None;

    if let Some(data) = &request.data {
        if request.vendor_id == "MacID" {
            given_mac = Some(data.clone());
        } else {
            match serde_json::from_str::<Value>(data) {
                Ok(parsed) => {
                    given_vid = first_string(&parsed, &["vid", "vehicleId", "vehicle_id"]);
                    given_mac = first_string(&parsed, &["mac", "macId", "mac_id"]);
                }
                Err(_) => return false,
            }
        }
    }

    let identity = &orchestrator.services.identity;

    let mac_vid = given_mac.as_ref().map(|mac| identity.resolve("mac", mac));

    let resulting_vid = match (&given_vid, &mac_vid) {
        (Some(vid), Some(mac_vid)) => {
            if mac_vid != vid {
                identity.merge(mac_vid, vid);
            }
            Some(vid.clone())
        }
        (Some(vid), None) => Some(vid.clone()),
        (None, Some(mac_vid)) => Some(mac_vid.clone()),
        (None, None) => None,
    };

    if resulting_vid.is_none() && given_mac.is_none() {
        return true;
    }

    orchestrator.set_last_seen(resulting_vid.clone(), given_mac.clone());

    let stations = &orchestrator.services.stations;
    let cpid = &orchestrator.cpid;
    let entries = stations.pending_for_station(cpid);

    if entries.is_empty() {
        stations.set_pending(
            cpid,
            STATION_WILDCARD_CONNECTOR,
            PendingSession {
                id_tag: None,
                vid: resulting_vid,
                mac: given_mac,
                created_at: None,
                vid_pinned: false,
            },
        );
        return true;
    }

    for (connector_id, mut pending) in entries {
        if let (Some(existing_vid), Some(new_vid)) = (&pending.vid, &resulting_vid) {
            if existing_vid != new_vid {
                if pending.vid_pinned {
                    identity.merge(new_vid, existing_vid);
                } else {
                    identity.merge(existing_vid, new_vid);
                }
            }
        }
        if resulting_vid.is_some() && !pending.vid_pinned {
            pending.vid = resulting_vid.clone();
        }
        if given_mac.is_some() {
            pending.mac = given_mac.clone();
        }
        stations.set_pending(cpid, connector_id, pending);
    }

    true
}

fn first_string(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}
