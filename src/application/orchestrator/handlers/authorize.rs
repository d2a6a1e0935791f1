//! Authorize — resolves `id_tag` to a VID and reconciles it against any
//! pending-session context already seeded by StatusNotification or
//! DataTransfer for this station.

use std::sync::Arc;

use rust_ocpp::v1_6::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;

use crate::application::orchestrator::state::Orchestrator;

use super::HandlerError;

pub async fn handle(orchestrator: &Arc<Orchestrator>, payload: Value) -> Result<Value, HandlerError> {
    let request: AuthorizeRequest = serde_json::from_value(payload)
        .map_err(|e| ("FormationViolation".to_string(), e.to_string()))?;

    let vid = orchestrator
        .services
        .identity
        .resolve("id_tag", &request.id_tag);

    // Reconcile against every pending entry this station currently has —
    // OCPP's Authorize carries no connector id, so the id_tag's VID is
    // authoritative for whichever connector(s) are mid-preparation.
    let entries = orchestrator
        .services
        .stations
        .pending_for_station(&orchestrator.cpid);

    let mut last_seen_vid = vid.clone();

    for (connector_id, mut pending) in entries {
        if let Some(mac) = &pending.mac {
            let mac_vid = orchestrator.services.identity.resolve("mac", mac);
            if mac_vid != vid {
                orchestrator.services.identity.merge(&mac_vid, &vid);
            }
        }

        if pending.vid_pinned {
            // An operator asserted this VID explicitly (remote-start) — it
            // stays authoritative. The id_tag's VID folds into it instead
            // of the other way around.
            if let Some(pinned_vid) = pending.vid.clone() {
                if pinned_vid != vid {
                    orchestrator.services.identity.merge(&vid, &pinned_vid);
                }
                last_seen_vid = pinned_vid;
            }
        } else {
            if let Some(existing_vid) = &pending.vid {
                if existing_vid != &vid {
                    orchestrator.services.identity.merge(existing_vid, &vid);
                }
            }
            pending.vid = Some(vid.clone());
        }

        pending.id_tag = Some(request.id_tag.clone());
        orchestrator
            .services
            .stations
            .set_pending(&orchestrator.cpid, connector_id, pending);
    }

    orchestrator.set_last_seen(Some(last_seen_vid), None);

    let response = AuthorizeResponse {
        id_tag_info: IdTagInfo {
            status: AuthorizationStatus::Accepted,
            expiry_date: None,
            parent_id_tag: None,
        },
    };

    serde_json::to_value(&response).map_err(|e| ("InternalError".to_string(), e.to_string()))
}
